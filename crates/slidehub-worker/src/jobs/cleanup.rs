//! Upload session expiry sweep.

use slidehub_storage::SessionSweeper;

use crate::executor::JobExecutionError;

/// Removes idle upload sessions and orphaned chunk spools.
#[derive(Debug, Clone)]
pub struct SessionSweepJob {
    sweeper: SessionSweeper,
}

impl SessionSweepJob {
    pub fn new(sweeper: SessionSweeper) -> Self {
        Self { sweeper }
    }

    /// Run one sweep and return the number of sessions removed.
    pub async fn run(&self) -> Result<usize, JobExecutionError> {
        tracing::debug!("Running upload session sweep");
        let removed = self.sweeper.sweep_expired().await?;
        if removed > 0 {
            tracing::info!(removed, "Expired upload sessions removed");
        }
        Ok(removed)
    }
}
