//! Object-store publisher configuration.

use serde::{Deserialize, Serialize};

/// Which object-store implementation publishes generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Signed S3 requests through the AWS SDK.
    S3,
    /// Unsigned HTTP PUT against a publicly writable bucket.
    Http,
    /// A directory on the local filesystem.
    Local,
}

impl ProviderKind {
    /// Parse a provider name as accepted on the wire.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s3" | "aws" => Some(Self::S3),
            "http" | "public" => Some(Self::Http),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// Return the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Http => "http",
            Self::Local => "local",
        }
    }
}

/// One row of the worker-pool breakpoint table.
///
/// Jobs with at most `max_files` files get `workers` concurrent uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTierConfig {
    /// Inclusive upper bound on the file count for this tier.
    pub max_files: u64,
    /// Pool width for this tier.
    pub workers: usize,
}

/// Publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Default provider when a job does not choose one.
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    /// Default bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Default region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3 endpoint (MinIO and friends). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,
    /// Use path-style addressing against `endpoint`.
    #[serde(default)]
    pub force_path_style: bool,
    /// Access key ID. Empty means the ambient AWS credential chain.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Base URL used to build published object URLs. Empty means the
    /// virtual-hosted AWS URL for the bucket and region.
    #[serde(default)]
    pub public_base_url: String,
    /// Key prefix under which every job's output is published.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Root directory for the `local` provider.
    #[serde(default = "default_local_root")]
    pub local_root: String,
    /// Files at or above this size use a multipart transfer.
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold_bytes: u64,
    /// Segment size for multipart transfers.
    #[serde(default = "default_part_size")]
    pub part_size_bytes: u64,
    /// Segments of one multipart transfer allowed in flight.
    #[serde(default = "default_max_concurrent_parts")]
    pub max_concurrent_parts: usize,
    /// Pool breakpoints, ordered by `max_files`.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<PoolTierConfig>,
    /// Pool width for jobs larger than every tier.
    #[serde(default = "default_ceiling_workers")]
    pub ceiling_workers: usize,
    /// Hard cap on pool width regardless of tier.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Attempts per file, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Ceiling on the retry delay, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Connect timeout per request, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Read timeout per request, in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_seconds: u64,
    /// Progress is reported every this many settled files.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: String::new(),
            force_path_style: false,
            access_key: String::new(),
            secret_key: String::new(),
            public_base_url: String::new(),
            key_prefix: default_key_prefix(),
            local_root: default_local_root(),
            multipart_threshold_bytes: default_multipart_threshold(),
            part_size_bytes: default_part_size(),
            max_concurrent_parts: default_max_concurrent_parts(),
            tiers: default_tiers(),
            ceiling_workers: default_ceiling_workers(),
            max_workers: default_max_workers(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            connect_timeout_seconds: default_connect_timeout(),
            read_timeout_seconds: default_read_timeout(),
            report_every: default_report_every(),
        }
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::S3
}

fn default_bucket() -> String {
    "2026-demo".to_string()
}

fn default_region() -> String {
    "eu-west-2".to_string()
}

fn default_key_prefix() -> String {
    "dzi".to_string()
}

fn default_local_root() -> String {
    "./data/published".to_string()
}

fn default_multipart_threshold() -> u64 {
    5 * 1024 * 1024
}

fn default_part_size() -> u64 {
    5 * 1024 * 1024
}

fn default_max_concurrent_parts() -> usize {
    10
}

fn default_tiers() -> Vec<PoolTierConfig> {
    vec![
        PoolTierConfig {
            max_files: 1_000,
            workers: 20,
        },
        PoolTierConfig {
            max_files: 10_000,
            workers: 30,
        },
        PoolTierConfig {
            max_files: 50_000,
            workers: 50,
        },
    ]
}

fn default_ceiling_workers() -> usize {
    100
}

fn default_max_workers() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    200
}

fn default_max_backoff() -> u64 {
    5_000
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    60
}

fn default_report_every() -> u64 {
    100
}
