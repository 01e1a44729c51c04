//! Application state for the API server

use crate::{FolderPathResolver, PipelineOrchestrator};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Runs drafts
    pub orchestrator: Arc<PipelineOrchestrator>,

    /// Maps request tokens to folders
    pub resolver: Arc<dyn FolderPathResolver>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        resolver: Arc<dyn FolderPathResolver>,
    ) -> Self {
        Self {
            orchestrator,
            resolver,
        }
    }
}
