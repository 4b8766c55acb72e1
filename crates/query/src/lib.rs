pub mod ast;
pub mod backend;
pub mod cache;
pub mod compiled;
pub mod compiler;
pub mod error;
pub mod executor;

pub use backend::{BackendError, BackendRow, GraphBackend};
pub use cache::CachingCompiler;
pub use compiled::{CompiledEdge, CompiledQuery};
pub use compiler::QueryCompiler;
pub use error::{CompileError, ExecutionError};
pub use executor::{Execution, ExecutionStats, QueryExecutor, ResultNode, ResultRow};
