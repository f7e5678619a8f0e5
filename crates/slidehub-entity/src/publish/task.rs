//! A single file scheduled for publication.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One local file and the object key it is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishTask {
    /// File on local disk.
    pub local_path: PathBuf,
    /// Destination key in the object store.
    pub object_key: String,
    /// File length in bytes at enumeration time.
    pub size_bytes: u64,
    /// MIME type derived from the extension.
    pub content_type: String,
}

impl PublishTask {
    /// Build a task, deriving the content type from `local_path`.
    pub fn new(local_path: PathBuf, object_key: String, size_bytes: u64) -> Self {
        let content_type = content_type_for(&local_path).to_string();
        Self {
            local_path,
            object_key,
            size_bytes,
            content_type,
        }
    }
}

/// MIME type for a generated pyramid file.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("dzi") | Some("xml") => "application/xml",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
