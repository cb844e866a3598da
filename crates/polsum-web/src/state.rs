use std::sync::Arc;

use polsum_pipeline::{DocumentStore, JobRunner};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub runner: Arc<JobRunner>,
}
