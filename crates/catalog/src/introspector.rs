//! Schema discovery against the graph store: labels, stored query
//! templates, and whole-label subgraph dumps.
//!
//! Lookups run one after another on the borrowed session.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use kgpath_core::config::CatalogConfig;
use kgpath_graph::{Graph, GraphAssembler};
use kgpath_query::ast::quote;
use kgpath_query::{ExecutionError, GraphBackend, QueryExecutor};

use crate::error::IntrospectionError;
use crate::kind::{FieldLookup, TemplateDescriptor, TemplateKind};

const LABELS_QUERY: &str = "MATCH (n) RETURN DISTINCT labels(n) AS labels";

pub struct CatalogIntrospector<'a, B: GraphBackend + ?Sized> {
    executor: QueryExecutor<'a, B>,
    config: CatalogConfig,
}

impl<'a, B: GraphBackend + ?Sized> CatalogIntrospector<'a, B> {
    pub fn new(executor: QueryExecutor<'a, B>, config: CatalogConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Distinct labels in first-seen order.
    ///
    /// A row whose label set contains any excluded label is dropped whole,
    /// including its other labels.
    pub async fn list_labels(&self) -> Result<Vec<String>, IntrospectionError> {
        let rows = self.executor.run_raw(LABELS_QUERY).await?.rows;
        let mut labels: Vec<String> = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let set = row
                .get("labels")
                .and_then(Value::as_array)
                .ok_or_else(|| ExecutionError::MalformedRow {
                    row: index,
                    reason: "missing list column 'labels'".to_string(),
                })?;
            let names: Vec<&str> = set.iter().filter_map(Value::as_str).collect();

            if names
                .iter()
                .any(|name| self.config.excluded_labels.iter().any(|ex| ex == name))
            {
                continue;
            }
            for name in names {
                if !labels.iter().any(|seen| seen == name) {
                    labels.push(name.to_string());
                }
            }
        }

        debug!(labels = labels.len(), "listed catalog labels");
        Ok(labels)
    }

    /// Every template-labelled entry with its looked-up fields.
    ///
    /// Fails on the first template label whose lookup comes back empty.
    pub async fn list_templates(&self) -> Result<Vec<TemplateDescriptor>, IntrospectionError> {
        let labels = self.list_labels().await?;
        let mut descriptors = Vec::new();

        for label in labels {
            let Some(kind) = TemplateKind::detect(&label) else {
                debug!(label = %label, "not a template label, skipping");
                continue;
            };
            descriptors.push(self.describe(kind, &label).await?);
        }

        info!(templates = descriptors.len(), "discovered query templates");
        Ok(descriptors)
    }

    /// Run the lookups of one template label.
    pub async fn describe(
        &self,
        kind: TemplateKind,
        label: &str,
    ) -> Result<TemplateDescriptor, IntrospectionError> {
        let pattern = label_pattern(label)?;
        let mut fields = BTreeMap::new();

        for lookup in kind.lookups() {
            let value = self.lookup(&pattern, label, lookup).await?;
            fields.insert(lookup.field.to_string(), value);
        }

        Ok(TemplateDescriptor {
            kind,
            kind_name: TemplateKind::reported_name(label).to_string(),
            id: label.to_string(),
            fields,
        })
    }

    async fn lookup(
        &self,
        pattern: &str,
        label: &str,
        lookup: &FieldLookup,
    ) -> Result<String, IntrospectionError> {
        let query = format!(
            "MATCH {} WHERE n.node_type={} RETURN n.name AS {} LIMIT 1",
            pattern,
            quote(lookup.node_type),
            lookup.field
        );
        let rows = self.executor.run_raw(&query).await?.rows;

        let row = rows.first().ok_or_else(|| IntrospectionError::EmptyTemplate {
            label: label.to_string(),
            field: lookup.field,
        })?;
        let value = row
            .get(lookup.field)
            .and_then(Value::as_str)
            .ok_or_else(|| IntrospectionError::MissingField {
                label: label.to_string(),
                field: lookup.field,
            })?;

        Ok(self.config.strip_type_prefix(value).to_string())
    }

    /// Every node carrying `label` plus the relationships among them.
    pub async fn nodes_by_label(&self, label: &str) -> Result<Graph, IntrospectionError> {
        let pattern = label_pattern(label)?;

        let node_query = format!("MATCH {} RETURN [n{{.*}}] AS nodes", pattern);
        let rel_query = format!(
            "MATCH {} WITH collect(n) AS nodes \
             CALL apoc.path.subgraphAll(nodes, {{maxLevel:0}}) YIELD relationships AS rels \
             UNWIND rels AS r \
             RETURN [r{{.*, start:startNode(r).id, end:endNode(r).id, type:type(r), id:id(r)}}] AS rels",
            pattern
        );

        let mut records = self.executor.fetch_records(&node_query).await?.rows;
        records.extend(self.executor.fetch_records(&rel_query).await?.rows);

        let graph = GraphAssembler::assemble(&records)?;
        debug!(
            label,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded label subgraph"
        );
        Ok(graph)
    }
}

/// `(n:`label`)`; labels that would break out of the backtick quoting are refused.
fn label_pattern(label: &str) -> Result<String, IntrospectionError> {
    if label.is_empty() || label.contains('`') {
        return Err(IntrospectionError::InvalidLabel(label.to_string()));
    }
    Ok(format!("(n:`{}`)", label))
}
