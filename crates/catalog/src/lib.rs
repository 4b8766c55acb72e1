pub mod error;
pub mod introspector;
pub mod kind;
pub mod registry;

pub use error::IntrospectionError;
pub use introspector::CatalogIntrospector;
pub use kind::{FieldLookup, TemplateDescriptor, TemplateKind};
pub use registry::TemplateCatalog;
