//! Drives an upload from reassembly through generation to publication.
//!
//! The request path calls [`Orchestrator::submit`] (or `submit_file`),
//! which merges the upload, registers a job, and queues a
//! [`PipelineTask`]. A worker later calls [`Orchestrator::run`], which
//! records every stage transition in the [`JobRegistry`] and removes the
//! job's local files whether or not the run succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use uuid::Uuid;

use slidehub_core::config::AppConfig;
use slidehub_core::config::storage::StorageConfig;
use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;
use slidehub_core::traits::generator::TileGenerator;
use slidehub_entity::job::JobStatus;
use slidehub_entity::publish::PublishOptions;
use slidehub_entity::upload::MergedArtifact;
use slidehub_storage::chunked::assembler::sanitize_filename;
use slidehub_storage::{ChunkReassembler, SessionStore, StoreResolver};

use super::{PipelineDispatcher, PipelineTask, Submission};
use crate::publisher::Publisher;
use crate::registry::{JobRegistry, UpdateOutcome};

/// Owns the collaborators of the conversion pipeline.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    sessions: SessionStore,
    reassembler: ChunkReassembler,
    registry: JobRegistry,
    generator: Arc<dyn TileGenerator>,
    resolver: Arc<dyn StoreResolver>,
    publisher: Publisher,
    dispatcher: Arc<dyn PipelineDispatcher>,
    storage: StorageConfig,
    key_prefix: String,
}

impl Orchestrator {
    pub fn new(
        sessions: SessionStore,
        registry: JobRegistry,
        generator: Arc<dyn TileGenerator>,
        resolver: Arc<dyn StoreResolver>,
        dispatcher: Arc<dyn PipelineDispatcher>,
        config: &AppConfig,
    ) -> Self {
        Self {
            reassembler: ChunkReassembler::new(sessions.clone()),
            publisher: Publisher::new(registry.clone(), &config.publisher),
            sessions,
            registry,
            generator,
            resolver,
            dispatcher,
            storage: config.storage.clone(),
            key_prefix: config.publisher.key_prefix.trim_matches('/').to_string(),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Merge a complete chunked upload and queue it for conversion.
    pub async fn submit(&self, session_id: &str, options: PublishOptions) -> AppResult<Submission> {
        let status = self.sessions.query_status(session_id).await?;
        self.check_extension(&status.filename)?;
        if !status.complete {
            return Err(AppError::conflict(format!(
                "Session {session_id} is incomplete: {} of {} chunks received",
                status.received_count, status.total_chunks
            )));
        }

        let job_id = self.registry.create(&status.filename, status.bytes_received);
        let artifact = match self
            .reassembler
            .merge(session_id, &self.upload_dir(job_id))
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                self.fail_job(job_id, "Reassembly failed", &e)?;
                self.remove_dir(&self.upload_dir(job_id)).await;
                return Err(e);
            }
        };

        tracing::info!(job_id = %job_id, session_id, size_bytes = artifact.size_bytes, "Upload reassembled");
        self.enqueue(job_id, artifact, options).await
    }

    /// Store a single-request upload and queue it for conversion.
    pub async fn submit_file(
        &self,
        filename: &str,
        data: Bytes,
        options: PublishOptions,
    ) -> AppResult<Submission> {
        self.check_extension(filename)?;
        let size_bytes = data.len() as u64;
        if size_bytes == 0 {
            return Err(AppError::validation("Uploaded file is empty"));
        }
        if size_bytes > self.storage.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File is {size_bytes} bytes; the limit is {}",
                self.storage.max_upload_size_bytes
            )));
        }

        let job_id = self.registry.create(filename, size_bytes);
        let dir = self.upload_dir(job_id);
        let path = dir.join(sanitize_filename(filename));
        let written = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(&path, &data).await
        }
        .await;
        if let Err(e) = written {
            let err = AppError::from(e);
            self.fail_job(job_id, "Saving upload failed", &err)?;
            self.remove_dir(&dir).await;
            return Err(err);
        }

        tracing::info!(job_id = %job_id, filename, size_bytes, "Upload stored");
        let artifact = MergedArtifact {
            path,
            size_bytes,
            original_filename: filename.to_string(),
        };
        self.enqueue(job_id, artifact, options).await
    }

    async fn enqueue(
        &self,
        job_id: Uuid,
        artifact: MergedArtifact,
        options: PublishOptions,
    ) -> AppResult<Submission> {
        let file_size_bytes = artifact.size_bytes;
        let task = PipelineTask {
            job_id,
            artifact,
            options: options.normalized(),
        };
        if let Err(e) = self.dispatcher.dispatch(task).await {
            self.fail_job(job_id, "Queueing failed", &e)?;
            self.remove_dir(&self.upload_dir(job_id)).await;
            return Err(e);
        }
        Ok(Submission {
            job_id,
            status: JobStatus::Pending,
            file_size_bytes,
        })
    }

    /// Convert and publish one queued upload.
    ///
    /// Stage failures are recorded on the job and also returned. Local
    /// files for the job are removed on every path.
    pub async fn run(&self, task: PipelineTask) -> AppResult<()> {
        let output_dir = self.output_dir(task.job_id);
        let result = self.execute(&task, &output_dir).await;
        self.remove_dir(&self.upload_dir(task.job_id)).await;
        self.remove_dir(&output_dir).await;
        result
    }

    /// Fail a queued task that will never run and drop its local files.
    pub async fn abandon(&self, task: PipelineTask, reason: &str) -> AppResult<()> {
        self.registry.fail(task.job_id, reason)?;
        self.remove_dir(&self.upload_dir(task.job_id)).await;
        Ok(())
    }

    async fn execute(&self, task: &PipelineTask, output_dir: &Path) -> AppResult<()> {
        let job_id = task.job_id;
        let outcome = self.registry.update(
            job_id,
            JobStatus::Converting,
            10,
            "Converting to DZI format...",
        )?;
        if outcome == UpdateOutcome::Ignored {
            tracing::warn!(job_id = %job_id, "Job is no longer pending; skipping run");
            return Ok(());
        }

        let base_name = base_name(&task.artifact);
        let started = Instant::now();
        let generated = match self
            .generator
            .generate(&task.artifact.path, output_dir, &base_name)
            .await
        {
            Ok(generated) => generated,
            Err(e) => {
                self.fail_job(job_id, "Conversion failed", &e)?;
                return Err(e);
            }
        };
        tracing::info!(
            job_id = %job_id,
            input_bytes = task.artifact.size_bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Conversion finished"
        );

        self.registry.update(
            job_id,
            JobStatus::Uploading,
            50,
            "DZI conversion completed. Uploading to cloud...",
        )?;

        let prefix = if self.key_prefix.is_empty() {
            job_id.to_string()
        } else {
            format!("{}/{job_id}", self.key_prefix)
        };
        let published = async {
            let store = self.resolver.resolve(&task.options).await?;
            let report = self
                .publisher
                .publish(job_id, Arc::clone(&store), &generated.root, &prefix)
                .await?;
            Ok::<_, AppError>((store, report))
        }
        .await;
        let (store, report) = match published {
            Ok(published) => published,
            Err(e) => {
                self.fail_job(job_id, "Upload failed", &e)?;
                return Err(e);
            }
        };

        let url_for = |path: &Path| {
            let relative = path.strip_prefix(&generated.root).unwrap_or(path);
            let key = format!("{prefix}/{}", relative.to_string_lossy().replace('\\', "/"));
            report
                .manifest
                .get(&key)
                .cloned()
                .unwrap_or_else(|| store.object_url(&key))
        };
        self.registry
            .set_result(job_id, "dzi", &url_for(&generated.descriptor))?;
        if let Some(thumbnail) = &generated.thumbnail {
            self.registry
                .set_result(job_id, "thumbnail", &url_for(thumbnail))?;
        }
        self.registry.finish(job_id)?;

        tracing::info!(
            job_id = %job_id,
            files = report.files,
            bytes = report.bytes,
            workers = report.workers,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Job completed"
        );
        Ok(())
    }

    /// Record a stage failure. The job message carries a fixed summary; the
    /// underlying error text only goes to the log.
    fn fail_job(&self, job_id: Uuid, stage: &str, err: &AppError) -> AppResult<()> {
        tracing::error!(job_id = %job_id, stage, kind = %err.kind, error = %err.message, "Job failed");
        self.registry
            .fail(job_id, format!("{stage}: {}", failure_summary(err)))?;
        Ok(())
    }

    fn upload_dir(&self, job_id: Uuid) -> PathBuf {
        self.storage.uploads_dir().join(job_id.to_string())
    }

    fn output_dir(&self, job_id: Uuid) -> PathBuf {
        self.storage.output_dir().join(job_id.to_string())
    }

    fn check_extension(&self, filename: &str) -> AppResult<()> {
        if self.storage.is_allowed(filename) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "File type not supported: '{filename}'. Allowed: {}",
                self.storage.allowed_extensions.join(", ")
            )))
        }
    }

    async fn remove_dir(&self, dir: &Path) {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => tracing::debug!(path = %dir.display(), "Removed job directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %dir.display(), error = %e, "Failed to remove job directory"),
        }
    }
}

/// Client-facing description of a stage failure.
///
/// Validation and publish-count messages are built by this service from
/// request data and counters, so they are shown as they are. Every other
/// kind may carry process output, paths, or provider responses.
fn failure_summary(err: &AppError) -> String {
    let summary = match err.kind {
        ErrorKind::Validation | ErrorKind::PublishFailed => return err.message.clone(),
        ErrorKind::Conversion => "the tile generator exited with an error",
        ErrorKind::Storage => "a local file operation failed",
        ErrorKind::ExternalService => "the object store could not be reached",
        ErrorKind::Configuration => "the object store is not configured correctly",
        ErrorKind::CorruptSession => "the uploaded chunks are inconsistent",
        ErrorKind::NotFound => "expected files were missing",
        ErrorKind::ServiceUnavailable => "the service is too busy to accept the job",
        ErrorKind::Conflict
        | ErrorKind::ProtocolMismatch
        | ErrorKind::Serialization
        | ErrorKind::Internal => "an internal error occurred",
    };
    summary.to_string()
}

/// File stem of the merged artifact, used to name generated output.
fn base_name(artifact: &MergedArtifact) -> String {
    artifact
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "slide".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_summaries_hide_raw_error_text() {
        let err = AppError::conversion("'vips' exited with code 1: /data/uploads/x/a.svs: unknown format");
        assert_eq!(failure_summary(&err), "the tile generator exited with an error");

        let err = AppError::storage("Failed to write /data/output/x/a_files/0/0_0.jpg");
        assert!(!failure_summary(&err).contains("/data"));

        let err = AppError::validation("Unknown provider 'oss'; expected one of s3, http, local");
        assert_eq!(failure_summary(&err), err.message);
    }
}
