//! Conversion pipeline handler.

use async_trait::async_trait;

use slidehub_service::{Orchestrator, PipelineTask};

use crate::executor::{JobExecutionError, PipelineHandler};

/// Runs queued uploads through the [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct ConversionHandler {
    orchestrator: Orchestrator,
}

impl ConversionHandler {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl PipelineHandler for ConversionHandler {
    fn name(&self) -> &str {
        "conversion"
    }

    async fn handle(&self, task: PipelineTask) -> Result<(), JobExecutionError> {
        let job_id = task.job_id;
        let Err(err) = self.orchestrator.run(task).await else {
            return Ok(());
        };

        // Stage failures are recorded by the orchestrator. Anything that
        // escaped before the job reached a terminal state is recorded here.
        let registry = self.orchestrator.registry();
        match registry.get(job_id) {
            Ok(job) if job.status.is_terminal() => Err(JobExecutionError::Failed(job.message)),
            Ok(_) => {
                if let Err(e) = registry.fail(job_id, format!("Internal error: {}", err.message)) {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to mark job as failed");
                }
                Err(JobExecutionError::Internal(err))
            }
            Err(_) => Err(JobExecutionError::Internal(err)),
        }
    }

    async fn abandon(&self, task: PipelineTask, reason: &str) {
        let job_id = task.job_id;
        if let Err(e) = self.orchestrator.abandon(task, reason).await {
            tracing::error!(job_id = %job_id, error = %e, "Failed to abandon queued job");
        }
    }
}
