//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::RecomputeService;
use crate::config::Settings;
use crate::infrastructure::document::{Document, DocumentStore};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
///
/// Document-bound services (repository, tax rates) are built per document.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs }
    }

    pub fn document_store(&self) -> DocumentStore {
        DocumentStore::new(Arc::clone(&self.fs))
    }

    /// Recompute service over the persisted lines and tax rates of `document`.
    pub fn recompute_service(&self, document: &Document) -> RecomputeService {
        RecomputeService::new(
            Arc::new(document.repository()),
            Arc::from(document.tax_converter()),
        )
    }
}
