use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use kgpath_core::config::ExecutorConfig;
use kgpath_core::QueryTemplate;
use kgpath_graph::{key_from_value, PropertyMap, RawRecord};

use crate::backend::{BackendRow, GraphBackend};
use crate::compiled::CompiledQuery;
use crate::compiler::QueryCompiler;
use crate::error::ExecutionError;

/// One projected node position of a path result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultNode {
    pub id: String,
    pub bound: bool,
}

/// One path result, one entry per compiled node alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub nodes: Vec<ResultNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStats {
    pub elapsed: Duration,
    pub row_count: usize,
}

/// Decoded rows of one backend call plus its timing.
#[derive(Debug, Clone)]
pub struct Execution<T = ResultRow> {
    pub rows: Vec<T>,
    pub stats: ExecutionStats,
}

/// Runs compiled queries on a borrowed backend session.
///
/// Never retries: a backend failure is returned as-is.
pub struct QueryExecutor<'a, B: GraphBackend + ?Sized> {
    backend: &'a B,
    config: ExecutorConfig,
}

impl<'a, B: GraphBackend + ?Sized> QueryExecutor<'a, B> {
    pub fn new(backend: &'a B, config: ExecutorConfig) -> Self {
        Self { backend, config }
    }

    pub fn with_defaults(backend: &'a B) -> Self {
        Self::new(backend, ExecutorConfig::default())
    }

    pub async fn execute(&self, query: &CompiledQuery) -> Result<Execution, ExecutionError> {
        let (raw, stats) = self.timed(query.text()).await?;
        let rows = raw
            .iter()
            .enumerate()
            .map(|(i, row)| decode_path_row(i, row, query))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Execution { rows, stats })
    }

    /// Compile then execute. Compile failures surface as [`ExecutionError::Compile`].
    pub async fn execute_template(
        &self,
        compiler: &QueryCompiler,
        template: &QueryTemplate,
    ) -> Result<Execution, ExecutionError> {
        let compiled = compiler.compile(template)?;
        self.execute(&compiled).await
    }

    /// Run a discovery query whose rows carry `nodes`, `rels` and `supports`
    /// property bundles.
    pub async fn fetch_records(
        &self,
        query: &str,
    ) -> Result<Execution<RawRecord>, ExecutionError> {
        let (raw, stats) = self.timed(query).await?;
        let rows = raw
            .iter()
            .enumerate()
            .map(|(i, row)| decode_record(i, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Execution { rows, stats })
    }

    /// Rows exactly as the backend returned them.
    pub async fn run_raw(&self, query: &str) -> Result<Execution<BackendRow>, ExecutionError> {
        let (rows, stats) = self.timed(query).await?;
        Ok(Execution { rows, stats })
    }

    async fn timed(&self, query: &str) -> Result<(Vec<BackendRow>, ExecutionStats), ExecutionError> {
        let start = Instant::now();
        let rows = self.backend.run(query).await?;
        let stats = ExecutionStats {
            elapsed: start.elapsed(),
            row_count: rows.len(),
        };

        let elapsed_ms = stats.elapsed.as_millis() as u64;
        info!(elapsed_ms, rows = stats.row_count, "query executed");
        if elapsed_ms > self.config.slow_query_ms {
            warn!(
                elapsed_ms,
                threshold_ms = self.config.slow_query_ms,
                query,
                "slow query"
            );
        }
        Ok((rows, stats))
    }
}

fn malformed(row: usize, reason: impl Into<String>) -> ExecutionError {
    ExecutionError::MalformedRow {
        row,
        reason: reason.into(),
    }
}

fn decode_path_row(
    index: usize,
    row: &BackendRow,
    query: &CompiledQuery,
) -> Result<ResultRow, ExecutionError> {
    let column = query.projection_column();
    let items = row
        .get(column)
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(index, format!("missing list column '{}'", column)))?;

    if items.len() != query.node_count() {
        return Err(malformed(
            index,
            format!("expected {} nodes, got {}", query.node_count(), items.len()),
        ));
    }

    let nodes = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let id = item
                .get("id")
                .and_then(key_from_value)
                .ok_or_else(|| malformed(index, format!("node {} has no usable id", position)))?;
            let bound = item
                .get("bound")
                .and_then(Value::as_bool)
                .ok_or_else(|| malformed(index, format!("node {} has no bound flag", position)))?;
            Ok(ResultNode { id, bound })
        })
        .collect::<Result<Vec<_>, ExecutionError>>()?;

    Ok(ResultRow { nodes })
}

fn decode_record(index: usize, row: &BackendRow) -> Result<RawRecord, ExecutionError> {
    Ok(RawRecord {
        nodes: bundle_column(index, row, "nodes")?,
        rels: bundle_column(index, row, "rels")?,
        supports: bundle_column(index, row, "supports")?,
    })
}

/// An absent or null column is an empty list.
fn bundle_column(
    index: usize,
    row: &BackendRow,
    column: &str,
) -> Result<Vec<PropertyMap>, ExecutionError> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| malformed(index, format!("'{}' holds a non-object", column)))
            })
            .collect(),
        Some(_) => Err(malformed(index, format!("'{}' is not a list", column))),
    }
}
