//! Object-store trait for publishing generated files.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;
use crate::retry::RetryPolicy;

/// Tuning for multipart transfers of large files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultipartOptions {
    /// Size of every segment except possibly the last.
    pub part_size_bytes: u64,
    /// Segments allowed in flight at once.
    pub max_concurrent_parts: usize,
    /// Schedule for retrying a single failed segment.
    pub part_retry: RetryPolicy,
}

impl Default for MultipartOptions {
    fn default() -> Self {
        Self {
            part_size_bytes: 5 * 1024 * 1024,
            max_concurrent_parts: 10,
            part_retry: RetryPolicy::default(),
        }
    }
}

/// Destination for published pyramid files.
///
/// Implementations exist for S3 (signed), public buckets (unsigned HTTP
/// PUT), and a local directory. The trait is defined here in
/// `slidehub-core` and implemented in `slidehub-storage`.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "s3", "http", "local").
    fn provider_type(&self) -> &str;

    /// Check whether the store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Store `body` under `key` in a single request.
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<()>;

    /// Store the file at `path` under `key` as a segmented transfer.
    ///
    /// Returns the number of bytes sent. Stores without a native multipart
    /// protocol fall back to a single request.
    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        options: &MultipartOptions,
    ) -> AppResult<u64> {
        let _ = options;
        let body = tokio::fs::read(path).await?;
        let len = body.len() as u64;
        self.put_object(key, Bytes::from(body), content_type).await?;
        Ok(len)
    }

    /// Public URL of the object stored under `key`.
    fn object_url(&self, key: &str) -> String;
}
