//! Response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use slidehub_entity::job::{Job, JobStatus};
use slidehub_service::Submission;

/// Returned when an upload has been accepted for conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub file_size_bytes: u64,
    /// Where to poll for job progress.
    pub status_url: String,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            job_id: submission.job_id,
            status: submission.status,
            file_size_bytes: submission.file_size_bytes,
            status_url: format!("/api/status/{}", submission.job_id),
        }
    }
}

/// Every known job, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Pipelines waiting for a worker.
    pub queue_depth: usize,
    /// Upload sessions currently open.
    pub active_sessions: usize,
}

/// One entry of the service banner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

/// Service banner served at `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub endpoints: Vec<EndpointInfo>,
}
