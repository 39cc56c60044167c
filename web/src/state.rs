//! Application state for Axum handlers.

use recipe_catalog_core::ImageStore;
use recipe_catalog_runtime::Catalog;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; both fields are reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Recipe catalog: review queue, assembled reads and search.
    pub catalog: Arc<Catalog>,
    /// Where uploaded recipe images are written.
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, images: Arc<dyn ImageStore>) -> Self {
        Self { catalog, images }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
