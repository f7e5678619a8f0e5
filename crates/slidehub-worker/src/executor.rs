//! Pipeline handler seam between the runner and the business logic.

use async_trait::async_trait;

use slidehub_core::error::AppError;
use slidehub_service::PipelineTask;

/// Executes queued pipeline tasks.
#[async_trait]
pub trait PipelineHandler: Send + Sync + std::fmt::Debug + 'static {
    /// Handler name used in logs.
    fn name(&self) -> &str;

    /// Run one task to completion.
    async fn handle(&self, task: PipelineTask) -> Result<(), JobExecutionError>;

    /// Dispose of a task that was queued but will never run.
    async fn abandon(&self, task: PipelineTask, reason: &str) {
        tracing::warn!(job_id = %task.job_id, handler = self.name(), reason, "Dropping queued task");
    }
}

/// Error from pipeline execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The job failed and its failure is already recorded.
    #[error("Job failed: {0}")]
    Failed(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}
