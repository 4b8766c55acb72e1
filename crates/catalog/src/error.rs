use thiserror::Error;

use kgpath_graph::AssemblyError;
use kgpath_query::ExecutionError;

/// Catalog entries inconsistent with their declared kind, or lookups that failed.
#[derive(Debug, Error)]
pub enum IntrospectionError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("template label '{label}' has no node for field '{field}'")]
    EmptyTemplate { label: String, field: &'static str },

    #[error("template label '{label}' returned no text value for field '{field}'")]
    MissingField { label: String, field: &'static str },

    #[error("label '{0}' cannot be embedded in a pattern")]
    InvalidLabel(String),
}
