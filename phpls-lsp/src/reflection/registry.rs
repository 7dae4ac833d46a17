//! Bridge from the document registry to class lookups

use std::sync::Arc;

use super::{DocumentSourceLocator, ReflectedClass, SourceLocator};
use crate::state::DocumentRegistry;

/// Locates classes in every document of a [`DocumentRegistry`].
///
/// Documents are asked one after another, most recently added first, and
/// the first declaration found wins.
#[derive(Debug, Clone)]
pub struct RegistrySourceLocator {
    registry: Arc<DocumentRegistry>,
}

impl RegistrySourceLocator {
    #[must_use]
    pub fn new(registry: Arc<DocumentRegistry>) -> Self {
        Self { registry }
    }
}

impl SourceLocator for RegistrySourceLocator {
    fn locate(&self, name: &str) -> Option<ReflectedClass> {
        let found = self
            .registry
            .get_all()
            .into_iter()
            .find_map(|document| DocumentSourceLocator::new(document).locate(name));
        if found.is_none() {
            tracing::trace!(class = name, "not declared in any open document");
        }
        found
    }

    fn generation(&self) -> u64 {
        self.registry.generation()
    }
}
