//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use slidehub_entity::publish::PublishOptions;

/// Fields of a `POST /api/upload/chunk` multipart form, minus the payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChunkUploadForm {
    /// Client-chosen session identifier.
    #[validate(length(min = 1, max = 256, message = "session_id is required"))]
    pub session_id: String,
    /// Zero-based index of this chunk.
    pub chunk_index: u32,
    /// Total chunks the client will send.
    #[validate(range(min = 1, message = "total_chunks must be at least 1"))]
    pub total_chunks: u32,
    /// Name of the file being uploaded.
    #[validate(length(min = 1, max = 1024, message = "filename is required"))]
    pub filename: String,
}

/// Upload completion request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteUploadRequest {
    /// Session to finalize.
    #[validate(length(min = 1, max = 256, message = "session_id is required"))]
    pub session_id: String,
    /// Provider override.
    #[serde(default)]
    pub provider: Option<String>,
    /// Bucket override.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Region override.
    #[serde(default)]
    pub region: Option<String>,
}

impl CompleteUploadRequest {
    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            provider: self.provider.clone(),
            bucket: self.bucket.clone(),
            region: self.region.clone(),
        }
    }
}

/// Query string accepted by `POST /api/upload`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishQuery {
    pub provider: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
}

impl From<PublishQuery> for PublishOptions {
    fn from(query: PublishQuery) -> Self {
        Self {
            provider: query.provider,
            bucket: query.bucket,
            region: query.region,
        }
    }
}
