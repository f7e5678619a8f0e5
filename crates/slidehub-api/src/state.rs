//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use slidehub_core::config::AppConfig;
use slidehub_service::{JobRegistry, Orchestrator};
use slidehub_storage::SessionStore;
use slidehub_worker::PipelineQueue;

/// Shared state injected into every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Upload and conversion pipeline entry points.
    pub orchestrator: Orchestrator,
    /// Pending-pipeline queue, read for health reporting.
    pub queue: PipelineQueue,
    /// When the server started.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, orchestrator: Orchestrator, queue: PipelineQueue) -> Self {
        Self {
            config,
            orchestrator,
            queue,
            started_at: Instant::now(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        self.orchestrator.sessions()
    }

    pub fn registry(&self) -> &JobRegistry {
        self.orchestrator.registry()
    }
}
