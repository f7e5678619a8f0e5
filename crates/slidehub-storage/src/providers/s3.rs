//! S3 object store using the AWS SDK.
//!
//! Requests carry their own connect/read timeouts and the SDK retry layer
//! is disabled. The publisher retries whole files; inside a multipart
//! transfer each segment is retried on its own, so a failed part never
//! causes the parts before it to be sent again.

use std::future::Future;
use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;
use slidehub_core::retry::RetryPolicy;
use slidehub_core::traits::object_store::{MultipartOptions, ObjectStore};

/// S3 rejects non-final parts smaller than 5 MiB.
const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Connection settings for one bucket.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    /// Bucket name.
    pub bucket: String,
    /// Region name.
    pub region: String,
    /// Custom endpoint; `None` means AWS.
    pub endpoint: Option<String>,
    /// Use path-style addressing.
    pub force_path_style: bool,
    /// Explicit access key ID; `None` means the ambient credential chain.
    pub access_key: Option<String>,
    /// Explicit secret access key.
    pub secret_key: Option<String>,
    /// Base URL for published object URLs.
    pub public_base_url: Option<String>,
    /// Connect timeout per request.
    pub connect_timeout: Duration,
    /// Read timeout per request.
    pub read_timeout: Duration,
}

/// S3-compatible object store.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    settings: S3Settings,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.settings.bucket)
            .field("region", &self.settings.region)
            .field("endpoint", &self.settings.endpoint)
            .finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// Build a client for the given bucket.
    pub async fn new(settings: S3Settings) -> AppResult<Self> {
        if settings.bucket.is_empty() {
            return Err(AppError::configuration("S3 bucket name is empty"));
        }
        if settings.access_key.is_some() != settings.secret_key.is_some() {
            return Err(AppError::configuration(
                "S3 requires both access_key and secret_key when either is set",
            ));
        }

        tracing::info!(
            bucket = %settings.bucket,
            region = %settings.region,
            endpoint = ?settings.endpoint,
            "Initializing S3 object store"
        );

        let region = Region::new(settings.region.clone());
        let mut builder = match (&settings.access_key, &settings.secret_key) {
            (Some(key_id), Some(secret)) => aws_sdk_s3::config::Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(region)
                .credentials_provider(aws_sdk_s3::config::Credentials::new(
                    key_id.clone(),
                    secret.clone(),
                    None,
                    None,
                    "slidehub-config",
                )),
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        builder = builder
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(settings.connect_timeout)
                    .read_timeout(settings.read_timeout)
                    .build(),
            )
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if settings.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            settings,
        })
    }

    /// Bucket this store writes to.
    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        path: &Path,
        part_number: i32,
        offset: u64,
        len: u64,
    ) -> AppResult<CompletedPart> {
        let data = read_segment(path, offset, len).await?;
        let output = self
            .client
            .upload_part()
            .bucket(&self.settings.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| map_sdk_error("upload_part", key, e))?;

        Ok(CompletedPart::builder()
            .e_tag(output.e_tag().unwrap_or_default())
            .part_number(part_number)
            .build())
    }


    async fn abort(&self, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.settings.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            tracing::warn!(key, upload_id, error = %DisplayErrorContext(&e), "Failed to abort multipart upload");
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.client
            .head_bucket()
            .bucket(&self.settings.bucket)
            .send()
            .await
            .map(|_| true)
            .map_err(|e| map_sdk_error("head_bucket", &self.settings.bucket, e))
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> AppResult<()> {
        self.client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error("put_object", key, e))?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
        options: &MultipartOptions,
    ) -> AppResult<u64> {
        let size = tokio::fs::metadata(path).await?.len();
        let part_size = options.part_size_bytes.max(MIN_PART_SIZE);
        if size <= part_size {
            let body = tokio::fs::read(path).await?;
            self.put_object(key, Bytes::from(body), content_type).await?;
            return Ok(size);
        }

        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.settings.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| map_sdk_error("create_multipart_upload", key, e))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| AppError::external_service("S3 did not return an upload id"))?
            .to_string();

        let uploaded = upload_segments(
            key,
            size,
            part_size,
            options.max_concurrent_parts,
            &options.part_retry,
            |segment| self.upload_part(key, &upload_id, path, segment.number, segment.offset, segment.len),
        )
        .await;
        let parts = match uploaded {
            Ok(parts) => parts,
            Err(e) => {
                self.abort(key, &upload_id).await;
                return Err(e);
            }
        };

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();
        if let Err(e) = self
            .client
            .complete_multipart_upload()
            .bucket(&self.settings.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(completed)
            .send()
            .await
        {
            self.abort(key, &upload_id).await;
            return Err(map_sdk_error("complete_multipart_upload", key, e));
        }

        tracing::debug!(key, size, part_size, "Multipart upload complete");
        Ok(size)
    }

    fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if let Some(base) = &self.settings.public_base_url {
            return format!("{}/{key}", base.trim_end_matches('/'));
        }
        match &self.settings.endpoint {
            Some(endpoint) if self.settings.force_path_style => format!(
                "{}/{}/{key}",
                endpoint.trim_end_matches('/'),
                self.settings.bucket
            ),
            _ => format!(
                "https://{}.s3.{}.amazonaws.com/{key}",
                self.settings.bucket, self.settings.region
            ),
        }
    }
}

/// One slice of a multipart transfer. Part numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    number: i32,
    offset: u64,
    len: u64,
}

/// Send every segment of a `size`-byte object with bounded concurrency.
///
/// Each segment is retried with `retry` independently; the first segment
/// that exhausts its budget fails the whole transfer. Results come back in
/// part-number order.
async fn upload_segments<T, F, Fut>(
    key: &str,
    size: u64,
    part_size: u64,
    max_concurrent_parts: usize,
    retry: &RetryPolicy,
    upload: F,
) -> AppResult<Vec<T>>
where
    F: Fn(Segment) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let part_count = size.div_ceil(part_size);
    let upload = &upload;
    let mut parts: Vec<(i32, T)> = futures::stream::iter(0..part_count)
        .map(|i| {
            let offset = i * part_size;
            let segment = Segment {
                number: (i + 1) as i32,
                offset,
                len: part_size.min(size - offset),
            };
            async move {
                let label = format!("{key}#part{}", segment.number);
                let part = retry.run(&label, || upload(segment)).await?;
                Ok::<_, AppError>((segment.number, part))
            }
        })
        .buffer_unordered(max_concurrent_parts.max(1))
        .try_collect()
        .await?;
    parts.sort_by_key(|(number, _)| *number);
    Ok(parts.into_iter().map(|(_, part)| part).collect())
}

async fn read_segment(path: &Path, offset: u64, len: u64) -> AppResult<Vec<u8>> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Convert an SDK error, keeping the service error code in the message.
fn map_sdk_error<E>(op: &str, key: &str, err: SdkError<E>) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = match &err {
        SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
        _ => None,
    };
    let kind = if status == Some(404) {
        ErrorKind::NotFound
    } else {
        ErrorKind::ExternalService
    };
    let detail = DisplayErrorContext(&err).to_string();
    let message = match status {
        Some(code) => format!("S3 {op} failed for '{key}' (HTTP {code}): {detail}"),
        None => format!("S3 {op} failed for '{key}': {detail}"),
    };
    AppError::with_source(kind, message, err)
}
