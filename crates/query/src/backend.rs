use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// One result row, keyed by column name.
pub type BackendRow = serde_json::Map<String, serde_json::Value>;

/// Errors reported by a graph store session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("query rejected by backend: {0}")]
    Rejected(String),
}

/// A session on a graph store that accepts pattern-query text.
///
/// Implementations own the connection; callers must not share one session
/// across concurrent calls.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Run a query and return every row.
    async fn run(&self, query: &str) -> Result<Vec<BackendRow>, BackendError>;
}

#[async_trait]
impl<T: GraphBackend + ?Sized> GraphBackend for Arc<T> {
    async fn run(&self, query: &str) -> Result<Vec<BackendRow>, BackendError> {
        (**self).run(query).await
    }
}

