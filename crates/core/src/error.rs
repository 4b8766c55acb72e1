use thiserror::Error;

/// Errors raised while ingesting a query template document.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template document must be a JSON array of node specs, found {0}")]
    NotAnArray(String),

    #[error("Node spec at position {position} is not a JSON object")]
    NotAnObject { position: usize },
}
