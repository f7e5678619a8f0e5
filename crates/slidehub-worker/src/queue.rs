//! Bounded hand-off between request handlers and the worker runner.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_service::{PipelineDispatcher, PipelineTask};

/// Sending half of the pipeline queue.
///
/// Dispatch never waits: a full queue is reported as `ServiceUnavailable`
/// so the request path can shed load.
#[derive(Debug, Clone)]
pub struct PipelineQueue {
    sender: mpsc::Sender<PipelineTask>,
    capacity: usize,
}

/// Receiving half, owned by the [`crate::WorkerRunner`].
#[derive(Debug)]
pub struct PipelineReceiver {
    pub(crate) receiver: mpsc::Receiver<PipelineTask>,
}

impl PipelineQueue {
    /// Create a queue holding at most `capacity` pending tasks.
    pub fn new(capacity: usize) -> (Self, PipelineReceiver) {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender, capacity }, PipelineReceiver { receiver })
    }

    /// Tasks waiting to be picked up.
    pub fn depth(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl PipelineDispatcher for PipelineQueue {
    async fn dispatch(&self, task: PipelineTask) -> AppResult<()> {
        let job_id = task.job_id;
        match self.sender.try_send(task) {
            Ok(()) => {
                tracing::debug!(job_id = %job_id, depth = self.depth(), "Pipeline queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(job_id = %job_id, capacity = self.capacity, "Pipeline queue full");
                Err(AppError::service_unavailable(
                    "Conversion queue is full; retry later",
                ))
            }
            Err(TrySendError::Closed(_)) => Err(AppError::service_unavailable(
                "Conversion workers are shutting down",
            )),
        }
    }
}
