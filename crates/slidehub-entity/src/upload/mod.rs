//! Chunked upload session entities.

pub mod session;

pub use session::{ChunkReceipt, MergedArtifact, SessionStatus, UploadSession};
