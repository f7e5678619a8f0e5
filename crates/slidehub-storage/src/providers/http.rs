//! Unsigned HTTP PUT object store for publicly writable buckets.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio_util::io::ReaderStream;

use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;
use slidehub_core::traits::object_store::{MultipartOptions, ObjectStore};

/// Writes objects with plain `PUT {base_url}/{key}` requests.
#[derive(Debug, Clone)]
pub struct HttpPutObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPutObjectStore {
    /// Create a store for an explicit base URL.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(100)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a store addressing an AWS bucket by its virtual-hosted URL.
    pub fn for_bucket(
        bucket: &str,
        region: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> AppResult<Self> {
        Self::new(bucket_url(bucket, region), connect_timeout, read_timeout)
    }

    async fn send(&self, key: &str, request: reqwest::RequestBuilder) -> AppResult<()> {
        let response = request.send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "timed out"
            } else if e.is_connect() {
                "connection failed"
            } else {
                "request failed"
            };
            AppError::with_source(
                ErrorKind::ExternalService,
                format!("PUT '{key}' {reason}: network error: {e}"),
                e,
            )
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        let kind = if status.as_u16() == 404 {
            ErrorKind::NotFound
        } else {
            ErrorKind::ExternalService
        };
        Err(AppError::new(
            kind,
            format!("PUT '{key}' failed (HTTP {}): {snippet}", status.as_u16()),
        ))
    }
}

/// Virtual-hosted URL of an AWS bucket.
pub fn bucket_url(bucket: &str, region: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com")
}

#[async_trait]
impl ObjectStore for HttpPutObjectStore {
    fn provider_type(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> AppResult<bool> {
        // Any HTTP answer, even a denial, proves the endpoint is reachable.
        match self.client.head(&self.base_url).send().await {
            Ok(_) => Ok(true),
            Err(e) => Err(AppError::with_source(
                ErrorKind::ServiceUnavailable,
                format!("Bucket endpoint {} unreachable", self.base_url),
                e,
            )),
        }
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<()> {
        let request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.send(key, request).await
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        _options: &MultipartOptions,
    ) -> AppResult<u64> {
        // Unsigned PUT has no multipart protocol; stream the file instead of
        // buffering it.
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let request = self
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));
        self.send(key, request).await?;
        Ok(size)
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}
