use thiserror::Error;

use crate::backend::BackendError;

/// A template that cannot be compiled. Never repaired silently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("template is empty")]
    Empty,

    #[error("unknown nodeSpecType '{value}' at position {position}")]
    UnknownNodeSpecType { position: usize, value: String },

    #[error("wildcard at position {position} directly follows another wildcard")]
    AdjacentWildcards { position: usize },

    #[error("node at position {position} is name-bound but has no label")]
    MissingLabel { position: usize },

    #[error("template has no concrete nodes")]
    NoConcreteNodes,

    #[error("wildcard at position {position} is not between two concrete nodes")]
    DanglingWildcard { position: usize },

    #[error("wildcard at position {position} has no hop span (meta)")]
    MissingSpan { position: usize },

    #[error("wildcard at position {position} has min {min} greater than max {max}")]
    InvalidSpan { position: usize, min: u32, max: u32 },

    #[error("no relationship kinds configured for edge constraints")]
    NoEdgeKinds,
}

/// Failure running a query against the backend.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Backend failure, passed through unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("malformed result row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}
