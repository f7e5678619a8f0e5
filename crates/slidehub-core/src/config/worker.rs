//! Pipeline worker configuration.

use serde::{Deserialize, Serialize};

/// Background pipeline worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of conversion pipelines allowed to run at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Capacity of the pending pipeline queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long shutdown waits for in-flight pipelines, in seconds.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_drain_timeout() -> u64 {
    30
}
