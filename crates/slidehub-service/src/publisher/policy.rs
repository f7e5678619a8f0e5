//! Pure selection rules for the publisher.

use slidehub_core::config::publisher::{PoolTierConfig, PublisherConfig};

/// Maps a job's file count to a worker-pool width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPolicy {
    tiers: Vec<PoolTierConfig>,
    ceiling: usize,
    max_workers: usize,
}

impl PoolPolicy {
    /// Build a policy from explicit tiers.
    ///
    /// Tiers are sorted by `max_files`, and each tier's width is raised to
    /// at least the previous one so the mapping never decreases.
    pub fn new(mut tiers: Vec<PoolTierConfig>, ceiling: usize, max_workers: usize) -> Self {
        tiers.sort_by_key(|t| t.max_files);
        let mut floor = 1;
        for tier in &mut tiers {
            tier.workers = tier.workers.max(floor);
            floor = tier.workers;
        }
        Self {
            tiers,
            ceiling: ceiling.max(floor),
            max_workers: max_workers.max(1),
        }
    }

    /// Build a policy from the publisher configuration.
    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(
            config.tiers.clone(),
            config.ceiling_workers,
            config.max_workers,
        )
    }

    /// Pool width for a job with `file_count` files.
    pub fn width(&self, file_count: u64) -> usize {
        let width = self
            .tiers
            .iter()
            .find(|tier| file_count <= tier.max_files)
            .map_or(self.ceiling, |tier| tier.workers);
        width.min(self.max_workers)
    }
}

/// How a single file is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    /// One `put_object` request.
    Single,
    /// Segmented transfer with bounded part concurrency.
    Multipart,
}

impl UploadMethod {
    /// Choose the method for a file of `size_bytes`.
    pub fn select(size_bytes: u64, multipart_threshold_bytes: u64) -> Self {
        if size_bytes < multipart_threshold_bytes {
            Self::Single
        } else {
            Self::Multipart
        }
    }
}
