//! Local storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Local working storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for chunk spools, merged uploads, and generated output.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Maximum accepted request body in bytes (one chunk or one whole file).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// File extensions accepted for conversion, lowercase with leading dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl StorageConfig {
    /// Directory holding per-session chunk spools.
    pub fn chunks_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_root).join("chunks")
    }

    /// Directory holding merged artifacts, one subdirectory per job.
    pub fn uploads_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_root).join("uploads")
    }

    /// Directory holding generated pyramids, one subdirectory per job.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_root).join("output")
    }

    /// Whether `filename` carries one of the allowed extensions.
    pub fn is_allowed(&self, filename: &str) -> bool {
        let lower = filename.to_ascii_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(ext.as_str()))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            max_upload_size_bytes: default_max_upload(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_max_upload() -> u64 {
    10 * 1024 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    [".svs", ".tiff", ".tif", ".ndpi", ".mrxs", ".png", ".jpg", ".jpeg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
