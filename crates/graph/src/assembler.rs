use tracing::debug;

use crate::error::AssemblyError;
use crate::record::{key_from_value, PropertyMap, RawRecord};
use crate::store::{Edge, Graph};

/// Result of batch composition.
#[derive(Debug, Clone)]
pub struct ComposedGraph {
    /// Fold of every per-record graph, in input order.
    pub graph: Graph,
    /// One graph per input record, kept for provenance.
    pub subgraphs: Vec<Graph>,
}

/// Builds [`Graph`]s from raw discovery records.
pub struct GraphAssembler;

impl GraphAssembler {
    /// Assemble records that describe one logical subgraph.
    ///
    /// Every node of every record is added before any edge, so an edge may
    /// reference a node listed in a sibling record. An edge whose endpoint is
    /// not among those nodes fails the whole assembly.
    pub fn assemble(records: &[RawRecord]) -> Result<Graph, AssemblyError> {
        let mut graph = Graph::new();

        for record in records {
            for props in &record.nodes {
                let id = required_key(props, "node", "id")?;
                graph.upsert_node(id, props.clone());
            }
        }

        for record in records {
            for props in record.edges() {
                graph.add_edge(edge_from_props(props)?)?;
            }
        }

        debug!(
            records = records.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "assembled subgraph"
        );
        Ok(graph)
    }

    /// Assemble a single record.
    pub fn assemble_record(record: &RawRecord) -> Result<Graph, AssemblyError> {
        Self::assemble(std::slice::from_ref(record))
    }

    /// Assemble each record on its own, then fold left-to-right.
    ///
    /// Later records win node property collisions; edges are never
    /// deduplicated by endpoint pair alone.
    pub fn compose(records: &[RawRecord]) -> Result<ComposedGraph, AssemblyError> {
        let subgraphs = records
            .iter()
            .map(Self::assemble_record)
            .collect::<Result<Vec<_>, _>>()?;

        let mut graph = Graph::new();
        for subgraph in &subgraphs {
            graph.merge(subgraph);
        }

        debug!(
            subgraphs = subgraphs.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "composed graph"
        );
        Ok(ComposedGraph { graph, subgraphs })
    }
}

fn required_key(
    props: &PropertyMap,
    element: &'static str,
    field: &'static str,
) -> Result<String, AssemblyError> {
    props
        .get(field)
        .and_then(key_from_value)
        .ok_or(AssemblyError::MissingField { element, field })
}

fn edge_from_props(props: &PropertyMap) -> Result<Edge, AssemblyError> {
    Ok(Edge {
        id: required_key(props, "edge", "id")?,
        source: required_key(props, "edge", "start")?,
        target: required_key(props, "edge", "end")?,
        edge_type: props
            .get("type")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        properties: props.clone(),
    })
}
