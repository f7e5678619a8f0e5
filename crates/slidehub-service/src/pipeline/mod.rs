//! Upload-to-publication pipeline.

pub mod orchestrator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use slidehub_core::result::AppResult;
use slidehub_entity::job::JobStatus;
use slidehub_entity::publish::PublishOptions;
use slidehub_entity::upload::MergedArtifact;

pub use orchestrator::Orchestrator;

/// Work item handed from the request path to a background worker.
#[derive(Debug, Clone)]
pub struct PipelineTask {
    pub job_id: Uuid,
    /// Merged input file on local disk.
    pub artifact: MergedArtifact,
    pub options: PublishOptions,
}

/// Answer returned to the client once a job is queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub file_size_bytes: u64,
}

/// Hands pipeline tasks to whatever runs them.
#[async_trait]
pub trait PipelineDispatcher: Send + Sync + std::fmt::Debug + 'static {
    /// Queue `task` without waiting for it to run.
    async fn dispatch(&self, task: PipelineTask) -> AppResult<()>;
}
