pub mod assembler;
pub mod error;
pub mod record;
pub mod store;

pub use assembler::{ComposedGraph, GraphAssembler};
pub use error::AssemblyError;
pub use record::{key_from_value, PropertyMap, RawRecord};
pub use store::{Edge, EdgeId, Graph, GraphStats, Node, NodeId};
