//! Per-job publish overrides.

use serde::{Deserialize, Serialize};

/// Destination overrides a client may attach to a job.
///
/// Unset fields fall back to the configured publisher defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Provider name (`s3`, `http`, `local`).
    #[serde(default)]
    pub provider: Option<String>,
    /// Bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Region name.
    #[serde(default)]
    pub region: Option<String>,
}

impl PublishOptions {
    /// Drop blank strings so they behave like unset fields.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            provider: clean(self.provider),
            bucket: clean(self.bucket),
            region: clean(self.region),
        }
    }
}
