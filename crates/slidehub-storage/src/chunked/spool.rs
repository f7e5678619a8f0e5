//! On-disk spool holding chunk payloads until their session is merged.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;

/// Stores each chunk at `{root}/{session_id}/{index:06}`.
#[derive(Debug, Clone)]
pub struct ChunkSpool {
    /// Directory holding one subdirectory per session.
    root: PathBuf,
}

impl ChunkSpool {
    /// Create a spool rooted at the given directory, creating it if needed.
    pub async fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create chunk spool: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Spool root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one session's chunks.
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    /// Location of a single chunk.
    pub fn chunk_path(&self, session_id: &str, index: u32) -> PathBuf {
        self.session_dir(session_id).join(format!("{index:06}"))
    }

    /// Persist a chunk payload.
    ///
    /// The payload is written beside its final name and renamed into place,
    /// so a reader never observes a partially written chunk.
    pub async fn write_chunk(&self, session_id: &str, index: u32, data: &Bytes) -> AppResult<u64> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create spool directory for session {session_id}"),
                e,
            )
        })?;

        let final_path = self.chunk_path(session_id, index);
        let tmp_path = dir.join(format!("{index:06}.tmp"));

        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create chunk {index} of session {session_id}"),
                e,
            )
        })?;
        file.write_all(data).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, "Failed to write chunk payload", e)
        })?;
        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush chunk", e))?;
        drop(file);

        fs::rename(&tmp_path, &final_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit chunk {index} of session {session_id}"),
                e,
            )
        })?;

        debug!(session_id, index, bytes = data.len(), "Spooled chunk");
        Ok(data.len() as u64)
    }

    /// Open a chunk for reading. A missing chunk maps to `NotFound`.
    pub async fn open_chunk(&self, session_id: &str, index: u32) -> AppResult<fs::File> {
        let path = self.chunk_path(session_id, index);
        fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Chunk {index} of session {session_id} is missing"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open chunk {index} of session {session_id}"),
                    e,
                )
            }
        })
    }

    /// Delete every chunk of a session. Missing directories are not an error.
    pub async fn remove_session(&self, session_id: &str) -> AppResult<()> {
        let dir = self.session_dir(session_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(session_id, "Removed chunk spool");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove chunk spool for session {session_id}"),
                e,
            )),
        }
    }

    /// Names of every session directory currently in the spool.
    pub async fn list_sessions(&self) -> AppResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}
