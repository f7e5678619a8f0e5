//! Concurrent publisher for generated pyramids.
//!
//! A publish run enumerates every file under an output directory, picks a
//! pool width from the file count, and uploads each file behind a
//! semaphore with its own retry budget. Progress is pushed into the
//! [`JobRegistry`] as files settle. There is no batch-level retry and no
//! rollback: objects that made it stay published when others fail.

pub mod error;
pub mod policy;
pub mod progress;
pub mod walker;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use slidehub_core::config::publisher::PublisherConfig;
use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_core::traits::object_store::{MultipartOptions, ObjectStore};
use slidehub_entity::publish::PublishTask;

use crate::registry::JobRegistry;

pub use error::{FailureCategory, PublishError};
pub use policy::{PoolPolicy, UploadMethod};
pub use progress::ProgressTracker;
pub use slidehub_core::retry::RetryPolicy;

/// Outcome of a fully successful publish run.
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// Object key to public URL for every published file.
    pub manifest: BTreeMap<String, String>,
    pub files: u64,
    pub bytes: u64,
    /// Pool width used for the run.
    pub workers: usize,
    pub elapsed: Duration,
}

/// Uploads directories of generated files to an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct Publisher {
    registry: JobRegistry,
    policy: PoolPolicy,
    retry: RetryPolicy,
    multipart: MultipartOptions,
    multipart_threshold_bytes: u64,
    report_every: u64,
}

impl Publisher {
    pub fn new(registry: JobRegistry, config: &PublisherConfig) -> Self {
        Self {
            registry,
            policy: PoolPolicy::from_config(config),
            retry: RetryPolicy::from_config(config),
            multipart: MultipartOptions {
                part_size_bytes: config.part_size_bytes,
                max_concurrent_parts: config.max_concurrent_parts.max(1),
                part_retry: RetryPolicy::from_config(config),
            },
            multipart_threshold_bytes: config.multipart_threshold_bytes,
            report_every: config.report_every,
        }
    }

    /// Publish every file under `root` as `<key_prefix>/<relative path>`.
    pub async fn publish(
        &self,
        job_id: Uuid,
        store: Arc<dyn ObjectStore>,
        root: &Path,
        key_prefix: &str,
    ) -> Result<PublishReport, PublishError> {
        let tasks = walker::collect_tasks(root, key_prefix).await?;
        let total_files = tasks.len() as u64;
        let total_bytes: u64 = tasks.iter().map(|t| t.size_bytes).sum();
        let workers = self.policy.width(total_files);

        tracing::info!(
            job_id = %job_id,
            provider = store.provider_type(),
            files = total_files,
            bytes = total_bytes,
            workers,
            "Publishing generated files"
        );

        let tracker = Arc::new(ProgressTracker::new(
            job_id,
            self.registry.clone(),
            total_files,
            total_bytes,
            self.report_every,
        ));
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut in_flight = JoinSet::new();

        for task in tasks {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| AppError::internal(format!("Upload pool closed: {e}")))?;
            let store = Arc::clone(&store);
            let tracker = Arc::clone(&tracker);
            let retry = self.retry;
            let multipart = self.multipart;
            let threshold = self.multipart_threshold_bytes;

            in_flight.spawn(async move {
                let _permit = permit;
                let result = retry
                    .run(&task.object_key, || {
                        upload_file(store.as_ref(), &task, threshold, &multipart)
                    })
                    .await;
                match result {
                    Ok(bytes) => {
                        tracker.record_success(bytes);
                        let url = store.object_url(&task.object_key);
                        (task.object_key, Ok(url))
                    }
                    Err(e) => {
                        tracker.record_failure();
                        (task.object_key, Err(e))
                    }
                }
            });
        }

        let mut manifest = BTreeMap::new();
        let mut failures = error::FailureLog::default();
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok((key, Ok(url))) => {
                    manifest.insert(key, url);
                }
                Ok((key, Err(e))) => failures.record(&key, &e),
                Err(e) => {
                    tracker.record_failure();
                    failures.record("<unknown>", &AppError::internal(format!("Upload task aborted: {e}")));
                }
            }
        }

        let snapshot = tracker.finish();
        if failures.count() > 0 {
            return Err(failures.into_error(&job_id.to_string(), total_files));
        }

        let secs = snapshot.elapsed.as_secs_f64();
        tracing::info!(
            job_id = %job_id,
            files = total_files,
            bytes = snapshot.completed_bytes,
            elapsed_ms = snapshot.elapsed.as_millis() as u64,
            files_per_sec = format!("{:.1}", if secs > 0.0 { total_files as f64 / secs } else { 0.0 }),
            "Publish complete"
        );

        Ok(PublishReport {
            manifest,
            files: total_files,
            bytes: snapshot.completed_bytes,
            workers,
            elapsed: snapshot.elapsed,
        })
    }
}

async fn upload_file(
    store: &dyn ObjectStore,
    task: &PublishTask,
    multipart_threshold_bytes: u64,
    multipart: &MultipartOptions,
) -> AppResult<u64> {
    match UploadMethod::select(task.size_bytes, multipart_threshold_bytes) {
        UploadMethod::Single => {
            let body = tokio::fs::read(&task.local_path).await?;
            let len = body.len() as u64;
            store
                .put_object(&task.object_key, Bytes::from(body), &task.content_type)
                .await?;
            Ok(len)
        }
        UploadMethod::Multipart => {
            store
                .put_multipart(&task.object_key, &task.local_path, &task.content_type, multipart)
                .await
        }
    }
}
