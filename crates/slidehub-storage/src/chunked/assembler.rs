//! Chunk reassembler: concatenates a complete session into one file.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;

use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;
use slidehub_entity::upload::MergedArtifact;

use super::store::{SessionStore, unknown_session};

/// Missing indices listed in a conflict message before truncating.
const MISSING_PREVIEW: usize = 20;

/// Merges complete sessions from a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct ChunkReassembler {
    store: SessionStore,
}

/// Why a merge stopped partway.
enum MergeFailure {
    /// Spooled data disagrees with the session record; the session is lost.
    Corrupt(AppError),
    /// Writing the destination failed; the session can be merged again.
    Io(AppError),
}

impl ChunkReassembler {
    /// Create a reassembler over the given store.
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Concatenate every chunk of `session_id`, in index order, into a file
    /// under `destination_dir`.
    ///
    /// The merged bytes are written to a hidden `.partial` file and renamed
    /// into place only once every chunk has been copied and checked against
    /// its recorded length. On success the chunk payloads and the session
    /// record are discarded, so a second merge reports `NotFound`.
    pub async fn merge(&self, session_id: &str, destination_dir: &Path) -> AppResult<MergedArtifact> {
        let slot = self
            .store
            .slot(session_id)
            .ok_or_else(|| unknown_session(session_id))?;
        let mut guard = slot.lock().await;
        if guard.closed {
            return Err(unknown_session(session_id));
        }

        if !guard.session.is_complete() {
            let missing = guard.session.missing_indices();
            let preview: Vec<String> = missing
                .iter()
                .take(MISSING_PREVIEW)
                .map(|i| i.to_string())
                .collect();
            let suffix = if missing.len() > MISSING_PREVIEW { ", ..." } else { "" };
            return Err(AppError::conflict(format!(
                "Session {session_id} is incomplete: {} of {} chunks missing [{}{suffix}]",
                missing.len(),
                guard.session.total_chunks,
                preview.join(", ")
            )));
        }

        guard.closed = true;
        let session = guard.session.clone();

        tracing::info!(
            session_id,
            total_chunks = session.total_chunks,
            bytes = session.bytes_received,
            "Merging upload session"
        );

        let file_name = sanitize_filename(&session.original_filename);
        let final_path = destination_dir.join(&file_name);
        let partial_path = destination_dir.join(format!(".{file_name}.partial"));

        let written = self
            .write_merged(session_id, &session.received, destination_dir, &partial_path, &final_path)
            .await;
        match written {
            Ok(size_bytes) => {
                if let Err(e) = self.store.spool().remove_session(session_id).await {
                    tracing::warn!(session_id, error = %e, "Failed to remove merged chunk spool");
                }
                self.store.remove(session_id, &slot);

                tracing::info!(
                    session_id,
                    path = %final_path.display(),
                    size_bytes,
                    "Merge complete"
                );
                Ok(MergedArtifact {
                    path: final_path,
                    size_bytes,
                    original_filename: session.original_filename,
                })
            }
            Err(MergeFailure::Corrupt(err)) => {
                let _ = fs::remove_file(&partial_path).await;
                if let Err(e) = self.store.spool().remove_session(session_id).await {
                    tracing::warn!(session_id, error = %e, "Failed to remove corrupt chunk spool");
                }
                self.store.remove(session_id, &slot);
                tracing::error!(session_id, error = %err, "Upload session is corrupt");
                Err(err)
            }
            Err(MergeFailure::Io(err)) => {
                let _ = fs::remove_file(&partial_path).await;
                guard.closed = false;
                tracing::error!(session_id, error = %err, "Merge failed");
                Err(err)
            }
        }
    }

    async fn write_merged(
        &self,
        session_id: &str,
        received: &BTreeMap<u32, u64>,
        destination_dir: &Path,
        partial_path: &Path,
        final_path: &Path,
    ) -> Result<u64, MergeFailure> {
        fs::create_dir_all(destination_dir).await.map_err(|e| {
            MergeFailure::Io(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create merge destination: {}", destination_dir.display()),
                e,
            ))
        })?;

        let mut out = fs::File::create(partial_path).await.map_err(|e| {
            MergeFailure::Io(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create {}", partial_path.display()),
                e,
            ))
        })?;

        let mut total = 0u64;
        for (&index, &expected) in received {
            let mut chunk = match self.store.spool().open_chunk(session_id, index).await {
                Ok(file) => file,
                Err(e) if e.kind == ErrorKind::NotFound => {
                    return Err(MergeFailure::Corrupt(AppError::corrupt_session(format!(
                        "Session {session_id}: chunk {index} is missing from the spool"
                    ))));
                }
                Err(e) => return Err(MergeFailure::Io(e)),
            };

            let copied = tokio::io::copy(&mut chunk, &mut out).await.map_err(|e| {
                MergeFailure::Io(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to copy chunk {index} of session {session_id}"),
                    e,
                ))
            })?;
            if copied != expected {
                return Err(MergeFailure::Corrupt(AppError::corrupt_session(format!(
                    "Session {session_id}: chunk {index} holds {copied} bytes, {expected} were recorded"
                ))));
            }
            total += copied;
        }

        out.flush().await.map_err(|e| {
            MergeFailure::Io(AppError::with_source(ErrorKind::Storage, "Failed to flush merged file", e))
        })?;
        out.sync_all().await.map_err(|e| {
            MergeFailure::Io(AppError::with_source(ErrorKind::Storage, "Failed to sync merged file", e))
        })?;
        drop(out);

        fs::rename(partial_path, final_path).await.map_err(|e| {
            MergeFailure::Io(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to finalize merged file: {}", final_path.display()),
                e,
            ))
        })?;

        Ok(total)
    }
}

/// Reduce a client-supplied name to a single safe path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "upload.bin".to_string(),
        _ => cleaned,
    }
}
