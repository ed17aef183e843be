//! Application state for the HTTP server.

use std::sync::Arc;

use crate::accounting::InventoryService;

/// State shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Accounting operations over the entity store
    pub service: Arc<InventoryService>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: Arc<InventoryService>) -> Self {
        Self { service }
    }
}
