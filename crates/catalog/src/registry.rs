use tracing::{info, warn};

use kgpath_query::GraphBackend;

use crate::error::IntrospectionError;
use crate::introspector::CatalogIntrospector;
use crate::kind::{TemplateDescriptor, TemplateKind};

/// In-memory list of discovered templates.
///
/// A refresh either replaces everything or changes nothing.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    descriptors: Vec<TemplateDescriptor>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rediscover templates. Returns the number now held.
    pub async fn refresh<B: GraphBackend + ?Sized>(
        &mut self,
        introspector: &CatalogIntrospector<'_, B>,
    ) -> Result<usize, IntrospectionError> {
        match introspector.list_templates().await {
            Ok(descriptors) => {
                self.descriptors = descriptors;
                info!(templates = self.descriptors.len(), "template catalog refreshed");
                Ok(self.descriptors.len())
            }
            Err(e) => {
                warn!(error = %e, kept = self.descriptors.len(), "template catalog refresh failed");
                Err(e)
            }
        }
    }

    pub fn descriptors(&self) -> &[TemplateDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, id: &str) -> Option<&TemplateDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    pub fn by_kind(&self, kind: TemplateKind) -> impl Iterator<Item = &TemplateDescriptor> {
        self.descriptors.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
