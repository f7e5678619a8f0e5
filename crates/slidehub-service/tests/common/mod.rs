//! Test doubles shared by the service integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_core::traits::generator::{GeneratedOutput, TileGenerator};
use slidehub_core::traits::object_store::{MultipartOptions, ObjectStore};
use slidehub_service::{PipelineDispatcher, PipelineTask};

/// In-memory object store that rejects keys ending in any of a fixed set
/// of suffixes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub objects: DashMap<String, Bytes>,
    pub attempts: DashMap<String, u32>,
    pub multipart_calls: AtomicU32,
    failing: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn attempt(&self, key: &str) -> AppResult<()> {
        *self.attempts.entry(key.to_string()).or_default() += 1;
        if self.failing.iter().any(|suffix| key.ends_with(suffix.as_str())) {
            return Err(AppError::external_service(format!(
                "S3 put_object failed for '{key}' (HTTP 403): AccessDenied"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> AppResult<()> {
        self.attempt(key)?;
        self.objects.insert(key.to_string(), body);
        Ok(())
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        _content_type: &str,
        _options: &MultipartOptions,
    ) -> AppResult<u64> {
        self.multipart_calls.fetch_add(1, Ordering::SeqCst);
        self.attempt(key)?;
        let body = Bytes::from(tokio::fs::read(path).await?);
        let len = body.len() as u64;
        self.objects.insert(key.to_string(), body);
        Ok(len)
    }

    fn object_url(&self, key: &str) -> String {
        format!("mem://{key}")
    }
}

/// Generator that writes a tiny fixed pyramid, or fails on demand.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    pub fail: bool,
}

#[async_trait]
impl TileGenerator for FakeGenerator {
    async fn generate(
        &self,
        input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> AppResult<GeneratedOutput> {
        if self.fail {
            return Err(AppError::conversion(format!(
                "'vips' exited with code 1: {} is not a known file format",
                input.display()
            )));
        }
        let tiles = output_dir.join(format!("{base_name}_files"));
        for level in ["0", "1"] {
            tokio::fs::create_dir_all(tiles.join(level)).await?;
            tokio::fs::write(tiles.join(level).join("0_0.jpg"), b"jpeg").await?;
        }
        let descriptor = output_dir.join(format!("{base_name}.dzi"));
        tokio::fs::write(&descriptor, b"<Image TileSize=\"256\"/>").await?;
        let thumbnail = output_dir.join(format!("{base_name}_thumbnail.jpg"));
        tokio::fs::write(&thumbnail, b"thumb").await?;
        Ok(GeneratedOutput {
            root: output_dir.to_path_buf(),
            descriptor,
            thumbnail: Some(thumbnail),
        })
    }
}

/// Dispatcher that records tasks instead of running them.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    pub tasks: Mutex<Vec<PipelineTask>>,
}

impl RecordingDispatcher {
    pub fn take(&self) -> Vec<PipelineTask> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

#[async_trait]
impl PipelineDispatcher for RecordingDispatcher {
    async fn dispatch(&self, task: PipelineTask) -> AppResult<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}
