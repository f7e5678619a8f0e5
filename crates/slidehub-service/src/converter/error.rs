//! Errors from running the external tile generator.

use std::path::PathBuf;

use slidehub_core::error::{AppError, ErrorKind};

/// Failures of a generator child process.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The binary could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process outlived its time budget and was killed.
    #[error("'{program}' timed out after {timeout_seconds}s")]
    Timeout {
        program: String,
        timeout_seconds: u64,
    },

    /// The process exited unsuccessfully.
    #[error("'{program}' exited with code {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    /// The process succeeded but its expected output is absent.
    #[error("Expected output not created: {}", path.display())]
    OutputMissing { path: PathBuf },

    #[error("I/O error while preparing conversion: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Io(e) => AppError::with_source(
                ErrorKind::Storage,
                "I/O error while preparing conversion",
                e,
            ),
            other => AppError::new(ErrorKind::Conversion, other.to_string()),
        }
    }
}
