//! Worker runner: consumes the pipeline queue with bounded concurrency.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use slidehub_core::config::worker::WorkerConfig;

use crate::executor::{JobExecutionError, PipelineHandler};
use crate::queue::PipelineReceiver;

/// Runs queued pipelines until shutdown, then drains in-flight work.
#[derive(Debug)]
pub struct WorkerRunner {
    receiver: PipelineReceiver,
    handler: Arc<dyn PipelineHandler>,
    config: WorkerConfig,
}

impl WorkerRunner {
    pub fn new(
        receiver: PipelineReceiver,
        handler: Arc<dyn PipelineHandler>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            receiver,
            handler,
            config,
        }
    }

    /// Start the worker runner; runs until the cancel signal is received
    /// or every queue sender is dropped.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);
        tracing::info!(
            handler = self.handler.name(),
            concurrency,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            let permit = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!("Worker received shutdown signal");
                        break;
                    }
                    continue;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let task = tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!("Worker received shutdown signal");
                        break;
                    }
                    continue;
                }
                task = self.receiver.receiver.recv() => match task {
                    Some(task) => task,
                    None => {
                        tracing::info!("Pipeline queue closed");
                        break;
                    }
                },
            };

            let handler = Arc::clone(&self.handler);
            in_flight.spawn(async move {
                let _permit = permit;
                let job_id = task.job_id;
                tracing::info!(job_id = %job_id, "Processing pipeline");
                match handler.handle(task).await {
                    Ok(()) => tracing::info!(job_id = %job_id, "Pipeline completed"),
                    Err(JobExecutionError::Failed(message)) => {
                        tracing::warn!(job_id = %job_id, message = %message, "Pipeline failed");
                    }
                    Err(JobExecutionError::Internal(err)) => {
                        tracing::error!(job_id = %job_id, error = %err, "Pipeline internal error");
                    }
                }
            });

            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Pipeline task panicked");
                }
            }
        }

        // Nothing queued will run now.
        self.receiver.receiver.close();
        let mut abandoned = 0usize;
        while let Ok(task) = self.receiver.receiver.try_recv() {
            self.handler
                .abandon(task, "Server shut down before the job started")
                .await;
            abandoned += 1;
        }

        tracing::info!(
            in_flight = in_flight.len(),
            abandoned,
            "Worker waiting for in-flight pipelines to complete..."
        );

        let drain = async {
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Pipeline task panicked");
                }
            }
        };
        let timeout = Duration::from_secs(self.config.drain_timeout_seconds);
        if tokio::time::timeout(timeout, drain).await.is_err() {
            tracing::warn!(
                remaining = in_flight.len(),
                timeout_seconds = self.config.drain_timeout_seconds,
                "Drain timed out; aborting remaining pipelines"
            );
            in_flight.abort_all();
        }

        tracing::info!("Worker shut down complete");
    }
}
