//! Shared application state handed to every route handler.

use std::sync::Arc;

use wts_config::Environment;
use wts_core::{ProgressTracker, SharedPaths};
use wts_store::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub store: JobStore,
    pub paths: SharedPaths,
    pub progress: Arc<ProgressTracker>,
    pub environment: Environment,
}
