//! Application state for the HTTP server.

use std::sync::Arc;

use crate::services::ReportService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Report pipeline with its cache and guard
    pub service: Arc<ReportService>,
}

impl AppState {
    /// Create a new application state around a service.
    pub fn new(service: ReportService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
