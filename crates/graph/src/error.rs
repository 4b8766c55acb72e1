use thiserror::Error;

/// Errors produced while turning raw records into a [`Graph`](crate::Graph).
#[derive(Debug, Error, PartialEq)]
pub enum AssemblyError {
    #[error("{element} is missing required field '{field}'")]
    MissingField {
        element: &'static str,
        field: &'static str,
    },

    #[error("edge {edge_id} references {endpoint} node '{node_id}' which is not in the record")]
    DanglingEdge {
        edge_id: String,
        endpoint: &'static str,
        node_id: String,
    },
}
