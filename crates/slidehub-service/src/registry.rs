//! In-memory job registry.
//!
//! Every job mutation goes through this type. The state machine lives in
//! [`JobStatus::can_transition_to`]; updates that violate it, or that
//! arrive after the job reached a terminal state, are logged and ignored.
//! Publisher workers that settle after an early failure rely on this.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_entity::job::{Job, JobStatus};

/// Whether an update changed the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update was applied.
    Applied,
    /// The update was discarded (stale or illegal).
    Ignored,
}

/// Lock-guarded table of jobs keyed by id.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, Job>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job.
    pub fn create(&self, original_filename: &str, file_size_bytes: u64) -> Uuid {
        let job = Job::new(original_filename, file_size_bytes);
        let id = job.id;
        self.jobs.insert(id, job);
        tracing::info!(job_id = %id, filename = original_filename, file_size_bytes, "Job created");
        id
    }

    /// Move a job to `status` with the given progress and message.
    ///
    /// Progress is clamped to `[0, 100]` and never moves backwards. Unknown
    /// ids are an error; stale or illegal transitions are not.
    pub fn update(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: u8,
        message: impl Into<String>,
    ) -> AppResult<UpdateOutcome> {
        let mut entry = self.jobs.get_mut(&job_id).ok_or_else(|| unknown_job(job_id))?;
        let job = entry.value_mut();

        if !job.status.can_transition_to(status) {
            tracing::warn!(
                job_id = %job_id,
                from = %job.status,
                to = %status,
                "Ignoring job update"
            );
            return Ok(UpdateOutcome::Ignored);
        }

        let progress = match status {
            JobStatus::Failed => job.progress,
            _ => progress.min(100).max(job.progress),
        };
        if job.status != status {
            tracing::info!(job_id = %job_id, from = %job.status, to = %status, progress, "Job transition");
        }
        job.status = status;
        job.progress = progress;
        job.message = message.into();
        job.updated_at = Utc::now();
        Ok(UpdateOutcome::Applied)
    }

    /// Raise the progress of a job without changing its status or message.
    pub fn report_progress(&self, job_id: Uuid, progress: u8) -> AppResult<UpdateOutcome> {
        let mut entry = self.jobs.get_mut(&job_id).ok_or_else(|| unknown_job(job_id))?;
        let job = entry.value_mut();
        if job.status.is_terminal() {
            tracing::debug!(job_id = %job_id, status = %job.status, "Ignoring late progress report");
            return Ok(UpdateOutcome::Ignored);
        }
        job.progress = progress.min(100).max(job.progress);
        job.updated_at = Utc::now();
        Ok(UpdateOutcome::Applied)
    }

    /// Record a published artifact. Only allowed while the job is uploading.
    pub fn set_result(&self, job_id: Uuid, name: &str, reference: &str) -> AppResult<()> {
        let mut entry = self.jobs.get_mut(&job_id).ok_or_else(|| unknown_job(job_id))?;
        let job = entry.value_mut();
        if job.status != JobStatus::Uploading {
            return Err(AppError::conflict(format!(
                "Job {job_id} is {}; results can only be recorded while uploading",
                job.status
            )));
        }
        job.result_refs.insert(name.to_string(), reference.to_string());
        job.updated_at = Utc::now();
        Ok(())
    }

    /// Mark an uploading job as completed.
    pub fn finish(&self, job_id: Uuid) -> AppResult<UpdateOutcome> {
        self.update(
            job_id,
            JobStatus::Completed,
            100,
            "Conversion and upload completed successfully!",
        )
    }

    /// Mark a job as failed with a human-readable reason.
    pub fn fail(&self, job_id: Uuid, message: impl Into<String>) -> AppResult<UpdateOutcome> {
        let message = message.into();
        let outcome = self.update(job_id, JobStatus::Failed, 0, message.clone())?;
        if outcome == UpdateOutcome::Applied {
            tracing::error!(job_id = %job_id, message = %message, "Job failed");
        }
        Ok(outcome)
    }

    /// Snapshot of one job.
    pub fn get(&self, job_id: Uuid) -> AppResult<Job> {
        self.jobs
            .get(&job_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| unknown_job(job_id))
    }

    /// Snapshot of every job, newest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }
}

fn unknown_job(job_id: Uuid) -> AppError {
    AppError::not_found(format!("Job {job_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidehub_core::error::ErrorKind;

    #[test]
    fn happy_path() {
        let registry = JobRegistry::new();
        let id = registry.create("a.svs", 10);
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Pending);

        registry.update(id, JobStatus::Converting, 10, "Converting").unwrap();
        registry.update(id, JobStatus::Uploading, 50, "Uploading").unwrap();
        registry.set_result(id, "dzi", "https://x/a.dzi").unwrap();
        assert_eq!(registry.finish(id).unwrap(), UpdateOutcome::Applied);

        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result_refs["dzi"], "https://x/a.dzi");
    }

    #[test]
    fn updates_after_failure_are_ignored() {
        let registry = JobRegistry::new();
        let id = registry.create("a.svs", 10);
        registry.update(id, JobStatus::Converting, 10, "Converting").unwrap();
        registry.fail(id, "Conversion failed: boom").unwrap();

        let outcome = registry.update(id, JobStatus::Uploading, 60, "late").unwrap();
        assert_eq!(outcome, UpdateOutcome::Ignored);
        assert_eq!(registry.report_progress(id, 90).unwrap(), UpdateOutcome::Ignored);
        assert_eq!(registry.finish(id).unwrap(), UpdateOutcome::Ignored);

        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.message, "Conversion failed: boom");
        assert_eq!(job.progress, 10);
    }

    #[test]
    fn illegal_transitions_are_ignored() {
        let registry = JobRegistry::new();
        let id = registry.create("a.svs", 10);
        let outcome = registry.update(id, JobStatus::Completed, 100, "skip").unwrap();
        assert_eq!(outcome, UpdateOutcome::Ignored);
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn progress_never_decreases() {
        let registry = JobRegistry::new();
        let id = registry.create("a.svs", 10);
        registry.update(id, JobStatus::Converting, 10, "c").unwrap();
        registry.update(id, JobStatus::Uploading, 50, "u").unwrap();
        registry.report_progress(id, 80).unwrap();
        registry.report_progress(id, 60).unwrap();
        assert_eq!(registry.get(id).unwrap().progress, 80);
        registry.report_progress(id, 250).unwrap();
        assert_eq!(registry.get(id).unwrap().progress, 100);
    }

    #[test]
    fn results_only_while_uploading() {
        let registry = JobRegistry::new();
        let id = registry.create("a.svs", 10);
        let err = registry.set_result(id, "dzi", "x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[test]
    fn unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        let missing = Uuid::new_v4();
        assert_eq!(registry.get(missing).unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(
            registry
                .update(missing, JobStatus::Converting, 1, "x")
                .unwrap_err()
                .kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_never_leave_terminal_state() {
        let statuses = [
            JobStatus::Pending,
            JobStatus::Converting,
            JobStatus::Uploading,
            JobStatus::Completed,
            JobStatus::Failed,
        ];

        for round in 0..50u64 {
            let registry = JobRegistry::new();
            let id = registry.create("race.svs", 1);

            let mut handles = Vec::new();
            for worker in 0..8u64 {
                let registry = registry.clone();
                handles.push(tokio::spawn(async move {
                    // Cheap deterministic mix so each round and worker
                    // produces a different update sequence.
                    let mut seed = round.wrapping_mul(6364136223846793005) ^ (worker + 1);
                    let mut seen_terminal: Option<JobStatus> = None;
                    for _ in 0..40 {
                        seed ^= seed << 13;
                        seed ^= seed >> 7;
                        seed ^= seed << 17;
                        let status = statuses[(seed % statuses.len() as u64) as usize];
                        let progress = (seed % 101) as u8;
                        let _ = registry.update(id, status, progress, "fuzz");

                        let now = registry.get(id).unwrap().status;
                        if let Some(terminal) = seen_terminal {
                            assert_eq!(now, terminal, "left terminal state {terminal}");
                        } else if now.is_terminal() {
                            seen_terminal = Some(now);
                        }
                        tokio::task::yield_now().await;
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        }
    }
}
