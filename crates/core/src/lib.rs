pub mod config;
pub mod error;
pub mod template;

pub use config::Config;
pub use error::*;
pub use template::*;
