//! Commutative upload counters and periodic progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::registry::JobRegistry;

/// Start of the job's upload progress window.
pub const UPLOAD_PROGRESS_START: u8 = 50;
/// Highest progress the upload stage may report; 100 is reserved for completion.
pub const UPLOAD_PROGRESS_END: u8 = 99;

/// Shared counters for one publish run.
#[derive(Debug)]
pub struct ProgressTracker {
    job_id: Uuid,
    registry: JobRegistry,
    total_files: u64,
    total_bytes: u64,
    report_every: u64,
    started: Instant,
    completed_files: AtomicU64,
    completed_bytes: AtomicU64,
    failed_files: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed_files: u64,
    pub failed_files: u64,
    pub completed_bytes: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Files that finished, successfully or not.
    pub fn settled(&self) -> u64 {
        self.completed_files + self.failed_files
    }
}

impl ProgressTracker {
    pub fn new(
        job_id: Uuid,
        registry: JobRegistry,
        total_files: u64,
        total_bytes: u64,
        report_every: u64,
    ) -> Self {
        Self {
            job_id,
            registry,
            total_files,
            total_bytes,
            report_every: report_every.max(1),
            started: Instant::now(),
            completed_files: AtomicU64::new(0),
            completed_bytes: AtomicU64::new(0),
            failed_files: AtomicU64::new(0),
        }
    }

    /// Record a successful file and report if a boundary was crossed.
    pub fn record_success(&self, bytes: u64) {
        self.completed_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.completed_files.fetch_add(1, Ordering::AcqRel);
        self.maybe_report();
    }

    /// Record a failed file and report if a boundary was crossed.
    pub fn record_failure(&self) {
        self.failed_files.fetch_add(1, Ordering::AcqRel);
        self.maybe_report();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed_files: self.completed_files.load(Ordering::Acquire),
            failed_files: self.failed_files.load(Ordering::Acquire),
            completed_bytes: self.completed_bytes.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }

    /// Push the final figures regardless of the reporting interval.
    pub fn finish(&self) -> ProgressSnapshot {
        let snapshot = self.snapshot();
        self.report(&snapshot);
        snapshot
    }

    fn maybe_report(&self) {
        let snapshot = self.snapshot();
        let settled = snapshot.settled();
        if settled % self.report_every == 0 && settled < self.total_files {
            self.report(&snapshot);
        }
    }

    fn report(&self, snapshot: &ProgressSnapshot) {
        let settled = snapshot.settled();
        let progress = upload_progress(settled, self.total_files);
        if let Err(e) = self.registry.report_progress(self.job_id, progress) {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to record upload progress");
        }

        let secs = snapshot.elapsed.as_secs_f64();
        let files_per_sec = if secs > 0.0 { settled as f64 / secs } else { 0.0 };
        let mb_per_sec = if secs > 0.0 {
            snapshot.completed_bytes as f64 / (1024.0 * 1024.0) / secs
        } else {
            0.0
        };
        let remaining = self.total_files.saturating_sub(settled);
        let eta_seconds = if files_per_sec > 0.0 {
            (remaining as f64 / files_per_sec).round() as u64
        } else {
            0
        };

        tracing::info!(
            job_id = %self.job_id,
            settled,
            total = self.total_files,
            failed = snapshot.failed_files,
            bytes = snapshot.completed_bytes,
            total_bytes = self.total_bytes,
            progress,
            files_per_sec = format!("{files_per_sec:.1}"),
            mb_per_sec = format!("{mb_per_sec:.2}"),
            eta_seconds,
            "Upload progress"
        );
    }
}

/// Map `settled / total` into the upload window.
pub fn upload_progress(settled: u64, total: u64) -> u8 {
    if total == 0 {
        return UPLOAD_PROGRESS_END;
    }
    let pct = settled.min(total) * 100 / total;
    (UPLOAD_PROGRESS_START as u64 + pct / 2).min(UPLOAD_PROGRESS_END as u64) as u8
}
