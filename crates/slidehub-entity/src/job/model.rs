//! Job entity model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::JobStatus;

/// A conversion job tracked from reassembly to publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: Uuid,
    /// Current job status.
    pub status: JobStatus,
    /// Progress percentage in `[0, 100]`.
    pub progress: u8,
    /// Human-readable description of the current stage or failure.
    pub message: String,
    /// Named published artifacts (`dzi`, `thumbnail`) mapped to their URLs.
    pub result_refs: BTreeMap<String, String>,
    /// Name of the uploaded file.
    pub original_filename: String,
    /// Size of the reassembled file in bytes.
    pub file_size_bytes: u64,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job for a freshly reassembled upload.
    pub fn new(original_filename: impl Into<String>, file_size_bytes: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0,
            message: "File uploaded, queued for conversion".to_string(),
            result_refs: BTreeMap::new(),
            original_filename: original_filename.into(),
            file_size_bytes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Base name used for the descriptor and tile tree: the file name with
    /// its final extension removed.
    pub fn base_name(&self) -> &str {
        match self.original_filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.original_filename,
        }
    }
}
