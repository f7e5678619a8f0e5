//! Upload session lifetime configuration.

use serde::{Deserialize, Serialize};

/// Upload session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are discarded by the sweep.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Cron expression (with seconds) for the expiry sweep.
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            sweep_cron: default_sweep_cron(),
        }
    }
}

fn default_ttl() -> u64 {
    24 * 60 * 60
}

fn default_sweep_cron() -> String {
    "0 */5 * * * *".to_string()
}
