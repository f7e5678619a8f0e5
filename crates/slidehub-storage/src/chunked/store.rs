//! Process-lifetime table of in-progress upload sessions.
//!
//! Each session sits behind its own async mutex, so chunk arrivals for one
//! session serialize while unrelated sessions proceed independently. The
//! table itself is a sharded [`DashMap`]; entries are never borrowed across
//! an await point.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex;

use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_entity::upload::{ChunkReceipt, SessionStatus, UploadSession};

use super::spool::ChunkSpool;

/// Longest accepted session identifier.
const MAX_SESSION_ID_LEN: usize = 128;

/// A session plus the flag that retires it.
///
/// `closed` is set while a merge or sweep owns the session. Chunks that
/// lock a closed slot are rejected instead of writing into a spool that is
/// about to disappear.
#[derive(Debug)]
pub(crate) struct SessionSlot {
    pub(crate) session: UploadSession,
    pub(crate) closed: bool,
}

pub(crate) type SharedSlot = Arc<Mutex<SessionSlot>>;

/// Mapping from session id to received chunk set and metadata.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SharedSlot>>,
    spool: ChunkSpool,
}

impl SessionStore {
    /// Create an empty store backed by the given spool.
    pub fn new(spool: ChunkSpool) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            spool,
        }
    }

    /// The spool chunk payloads are written to.
    pub fn spool(&self) -> &ChunkSpool {
        &self.spool
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Record one chunk of a session, creating the session on first contact.
    ///
    /// Re-sending an index that is already stored is acknowledged without
    /// touching the spool or the counters. A `total_chunks` that disagrees
    /// with the session's recorded total is rejected and leaves the session
    /// unchanged.
    pub async fn receive_chunk(
        &self,
        session_id: &str,
        index: u32,
        total_chunks: u32,
        filename: &str,
        payload: Bytes,
    ) -> AppResult<ChunkReceipt> {
        validate_session_id(session_id)?;
        if total_chunks == 0 {
            return Err(AppError::validation("total_chunks must be at least 1"));
        }
        if index >= total_chunks {
            return Err(AppError::validation(format!(
                "chunk_index {index} is out of range for {total_chunks} chunks"
            )));
        }

        let payload_len = payload.len() as u64;
        let slot = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id, total_chunks, filename, "Upload session started");
                Arc::new(Mutex::new(SessionSlot {
                    session: UploadSession::new(session_id, total_chunks, filename, payload_len),
                    closed: false,
                }))
            })
            .clone();

        let mut guard = slot.lock().await;
        if guard.closed {
            return Err(AppError::conflict(format!(
                "Session {session_id} is being finalized and no longer accepts chunks"
            )));
        }

        let session = &mut guard.session;
        if session.total_chunks != total_chunks {
            tracing::warn!(
                session_id,
                declared = total_chunks,
                recorded = session.total_chunks,
                "Chunk declared a different total"
            );
            return Err(AppError::protocol_mismatch(format!(
                "Session {session_id} expects {} chunks, chunk declared {total_chunks}",
                session.total_chunks
            )));
        }

        if session.has_chunk(index) {
            session.touch();
            tracing::debug!(session_id, index, "Duplicate chunk ignored");
            return Ok(session.receipt(index, payload_len));
        }

        self.spool.write_chunk(session_id, index, &payload).await?;
        session.record_chunk(index, payload_len);

        tracing::debug!(
            session_id,
            index,
            received = session.received_count(),
            total = session.total_chunks,
            "Chunk stored"
        );
        if session.is_complete() {
            tracing::info!(
                session_id,
                total_chunks,
                bytes = session.bytes_received,
                "All chunks received"
            );
        }

        Ok(session.receipt(index, payload_len))
    }

    /// Report how far a session has progressed.
    pub async fn query_status(&self, session_id: &str) -> AppResult<SessionStatus> {
        let slot = self.slot(session_id).ok_or_else(|| unknown_session(session_id))?;
        let guard = slot.lock().await;
        Ok(guard.session.status())
    }

    /// Whether a session is currently tracked.
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub(crate) fn slot(&self, session_id: &str) -> Option<SharedSlot> {
        self.sessions.get(session_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every live slot, taken without holding shard locks afterwards.
    pub(crate) fn slots(&self) -> Vec<(String, SharedSlot)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Drop a session record if it is still the given slot.
    pub(crate) fn remove(&self, session_id: &str, slot: &SharedSlot) {
        self.sessions
            .remove_if(session_id, |_, current| Arc::ptr_eq(current, slot));
    }
}

pub(crate) fn unknown_session(session_id: &str) -> AppError {
    AppError::not_found(format!("Upload session {session_id} not found"))
}

/// Session ids name spool directories, so only a safe alphabet is accepted.
pub fn validate_session_id(session_id: &str) -> AppResult<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid session id '{session_id}': use 1-{MAX_SESSION_ID_LEN} characters from [A-Za-z0-9_-]"
        )))
    }
}
