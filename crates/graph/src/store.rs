use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::AssemblyError;
use crate::record::PropertyMap;

pub type NodeId = String;
pub type EdgeId = String;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Backend edge id; disambiguates parallel edges between the same endpoints.
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub edge_type: Option<String>,
    pub properties: PropertyMap,
}

impl Edge {
    fn identity(&self) -> EdgeKey {
        (self.source.clone(), self.target.clone(), self.id.clone())
    }
}

type EdgeKey = (NodeId, NodeId, EdgeId);

#[derive(Debug, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub edges_by_type: BTreeMap<String, usize>,
}

/// Directed multigraph assembled from backend results.
///
/// Nodes are keyed by backend id. Edges are keyed by `(source, target, id)`,
/// so two edges between the same endpoints stay distinct as long as their
/// backend ids differ. Iteration follows insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeKey, Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Insert a node, or overwrite the given properties on an existing one.
    ///
    /// Properties not present in `properties` are kept.
    pub fn upsert_node(&mut self, id: NodeId, properties: PropertyMap) {
        match self.nodes.get_mut(&id) {
            Some(existing) => existing.properties.extend(properties),
            None => {
                self.nodes.insert(id.clone(), Node { id, properties });
            }
        }
    }

    /// Add an edge whose endpoints are already in the graph.
    ///
    /// Returns `true` when the edge is new. Re-adding an edge with the same
    /// `(source, target, id)` overwrites its properties instead.
    pub fn add_edge(&mut self, edge: Edge) -> Result<bool, AssemblyError> {
        for (endpoint, node_id) in [("start", &edge.source), ("end", &edge.target)] {
            if !self.nodes.contains_key(node_id) {
                return Err(AssemblyError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    endpoint,
                    node_id: node_id.clone(),
                });
            }
        }
        Ok(self.insert_edge(edge))
    }

    fn insert_edge(&mut self, edge: Edge) -> bool {
        let key = edge.identity();
        match self.edges.get_mut(&key) {
            Some(existing) => {
                if edge.edge_type.is_some() {
                    existing.edge_type = edge.edge_type;
                }
                existing.properties.extend(edge.properties);
                false
            }
            None => {
                self.edges.insert(key, edge);
                true
            }
        }
    }

    /// All edges from `source` to `target`, parallel edges included.
    pub fn edges_between(&self, source: &str, target: &str) -> Vec<&Edge> {
        self.edges
            .values()
            .filter(|e| e.source == source && e.target == target)
            .collect()
    }

    pub fn outgoing(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.values().filter(|e| e.source == node_id).collect()
    }

    pub fn incoming(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.values().filter(|e| e.target == node_id).collect()
    }

    /// Fold `other` into `self`.
    ///
    /// Node properties from `other` win on id collision. Edges are additive:
    /// only an identical `(source, target, id)` is merged.
    pub fn merge(&mut self, other: &Graph) {
        for node in other.nodes.values() {
            self.upsert_node(node.id.clone(), node.properties.clone());
        }
        for edge in other.edges.values() {
            self.insert_edge(edge.clone());
        }
    }

    /// Owned variant of [`Graph::merge`].
    pub fn compose(mut self, other: &Graph) -> Graph {
        self.merge(other);
        self
    }

    pub fn stats(&self) -> GraphStats {
        let mut edges_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for edge in self.edges.values() {
            let kind = edge.edge_type.clone().unwrap_or_else(|| "unknown".to_string());
            *edges_by_type.entry(kind).or_default() += 1;
        }

        GraphStats {
            node_count: self.nodes.len(),
            edge_count: self.edges.len(),
            edges_by_type,
        }
    }

    /// Node-link JSON for downstream serialization.
    pub fn to_json(&self) -> Value {
        json!({
            "directed": true,
            "multigraph": true,
            "nodes": self.nodes.values().collect::<Vec<_>>(),
            "edges": self.edges.values().collect::<Vec<_>>(),
        })
    }
}
