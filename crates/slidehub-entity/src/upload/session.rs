//! Upload session state and the views handed back to clients.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// In-memory record of one resumable chunked transfer.
///
/// `total_chunks` is fixed by the first chunk that arrives. `received`
/// maps each distinct chunk index to the payload length stored for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    /// Client-supplied session identifier.
    pub session_id: String,
    /// Number of chunks the transfer is split into.
    pub total_chunks: u32,
    /// Received chunk index mapped to its payload length.
    pub received: BTreeMap<u32, u64>,
    /// Length of the first chunk received (informational).
    pub chunk_size: u64,
    /// Name of the file being uploaded.
    pub original_filename: String,
    /// Sum of payload lengths over distinct received indices.
    pub bytes_received: u64,
    /// When the first chunk arrived.
    pub created_at: DateTime<Utc>,
    /// When the session last accepted or re-acknowledged a chunk.
    pub last_activity_at: DateTime<Utc>,
}

impl UploadSession {
    /// Start a session from its first chunk's declared parameters.
    pub fn new(
        session_id: impl Into<String>,
        total_chunks: u32,
        original_filename: impl Into<String>,
        chunk_size: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            total_chunks,
            received: BTreeMap::new(),
            chunk_size,
            original_filename: original_filename.into(),
            bytes_received: 0,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Whether chunk `index` has already been stored.
    pub fn has_chunk(&self, index: u32) -> bool {
        self.received.contains_key(&index)
    }

    /// Record a newly stored chunk. Returns `false` if it was already present.
    pub fn record_chunk(&mut self, index: u32, len: u64) -> bool {
        self.last_activity_at = Utc::now();
        if self.received.contains_key(&index) {
            return false;
        }
        self.received.insert(index, len);
        self.bytes_received += len;
        true
    }

    /// Refresh the activity timestamp without recording anything.
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Number of distinct chunks received.
    pub fn received_count(&self) -> u32 {
        self.received.len() as u32
    }

    /// Whether every index in `[0, total_chunks)` has been received.
    pub fn is_complete(&self) -> bool {
        self.received_count() == self.total_chunks
    }

    /// Indices not yet received, ascending.
    pub fn missing_indices(&self) -> Vec<u32> {
        (0..self.total_chunks)
            .filter(|i| !self.received.contains_key(i))
            .collect()
    }

    /// Received fraction as a percentage in `[0, 100]`.
    pub fn progress_percent(&self) -> f64 {
        if self.total_chunks == 0 {
            return 0.0;
        }
        (self.received_count() as f64 / self.total_chunks as f64) * 100.0
    }

    /// Build the acknowledgement for a chunk just handled.
    pub fn receipt(&self, chunk_index: u32, bytes_in_chunk: u64) -> ChunkReceipt {
        ChunkReceipt {
            session_id: self.session_id.clone(),
            chunk_index,
            bytes_in_chunk,
            received_count: self.received_count(),
            total_chunks: self.total_chunks,
            complete: self.is_complete(),
        }
    }

    /// Snapshot the session for a status query.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id.clone(),
            received_count: self.received_count(),
            total_chunks: self.total_chunks,
            progress_percent: self.progress_percent(),
            bytes_received: self.bytes_received,
            complete: self.is_complete(),
            filename: self.original_filename.clone(),
        }
    }
}

/// Acknowledgement returned for every chunk, including duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkReceipt {
    /// Session the chunk belongs to.
    pub session_id: String,
    /// Index of the chunk acknowledged.
    pub chunk_index: u32,
    /// Length of the payload carried by this request.
    pub bytes_in_chunk: u64,
    /// Distinct chunks received so far.
    pub received_count: u32,
    /// Chunks expected in total.
    pub total_chunks: u32,
    /// Whether every chunk has now been received.
    pub complete: bool,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Session identifier.
    pub session_id: String,
    /// Distinct chunks received so far.
    pub received_count: u32,
    /// Chunks expected in total.
    pub total_chunks: u32,
    /// Received fraction as a percentage.
    pub progress_percent: f64,
    /// Bytes received over distinct chunks.
    pub bytes_received: u64,
    /// Whether every chunk has been received.
    pub complete: bool,
    /// Name of the file being uploaded.
    pub filename: String,
}

/// A reassembled file on local disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedArtifact {
    /// Location of the merged file.
    pub path: PathBuf,
    /// Length of the merged file in bytes.
    pub size_bytes: u64,
    /// Name the client gave the file.
    pub original_filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_chunk_does_not_change_counters() {
        let mut session = UploadSession::new("s1", 3, "a.svs", 4);
        assert!(session.record_chunk(1, 4));
        assert!(!session.record_chunk(1, 4));
        assert_eq!(session.received_count(), 1);
        assert_eq!(session.bytes_received, 4);
    }

    #[test]
    fn completeness_and_missing_indices() {
        let mut session = UploadSession::new("s1", 3, "a.svs", 4);
        session.record_chunk(2, 4);
        session.record_chunk(0, 4);
        assert!(!session.is_complete());
        assert_eq!(session.missing_indices(), vec![1]);
        session.record_chunk(1, 2);
        assert!(session.is_complete());
        assert!(session.missing_indices().is_empty());
        assert_eq!(session.bytes_received, 10);
        assert_eq!(session.progress_percent(), 100.0);
    }
}
