//! Per-job object-store resolution.

use std::sync::Arc;
#[cfg(any(feature = "s3", feature = "http"))]
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use slidehub_core::config::publisher::{ProviderKind, PublisherConfig};
use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_core::traits::object_store::ObjectStore;
use slidehub_entity::publish::PublishOptions;

use super::local::LocalObjectStore;

/// Picks the object store a job publishes to.
#[async_trait]
pub trait StoreResolver: Send + Sync + std::fmt::Debug + 'static {
    /// Return the store for the given overrides.
    async fn resolve(&self, options: &PublishOptions) -> AppResult<Arc<dyn ObjectStore>>;
}

/// Fully resolved destination, used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Destination {
    provider: ProviderKind,
    bucket: String,
    region: String,
}

/// Builds stores from [`PublisherConfig`] and caches them per destination.
#[derive(Debug)]
pub struct ConfigStoreResolver {
    config: PublisherConfig,
    stores: DashMap<Destination, Arc<dyn ObjectStore>>,
}

impl ConfigStoreResolver {
    /// Create a resolver over the publisher configuration.
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            config,
            stores: DashMap::new(),
        }
    }

    fn destination(&self, options: &PublishOptions) -> AppResult<Destination> {
        let provider = match options.provider.as_deref() {
            Some(name) => ProviderKind::parse(name).ok_or_else(|| {
                AppError::validation(format!(
                    "Unknown provider '{name}'; expected one of s3, http, local"
                ))
            })?,
            None => self.config.provider,
        };
        if provider == ProviderKind::Local && self.config.provider != ProviderKind::Local {
            return Err(AppError::validation(
                "Provider 'local' can only be selected by server configuration",
            ));
        }

        let bucket = options.bucket.as_deref().unwrap_or(&self.config.bucket);
        validate_bucket(bucket)?;
        let region = options.region.as_deref().unwrap_or(&self.config.region);
        validate_region(region)?;

        Ok(Destination {
            provider,
            bucket: bucket.to_string(),
            region: region.to_string(),
        })
    }

    fn non_empty(value: &str) -> Option<String> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    async fn build(&self, dest: &Destination) -> AppResult<Arc<dyn ObjectStore>> {
        match dest.provider {
            ProviderKind::Local => {
                let root = std::path::Path::new(&self.config.local_root).join(&dest.bucket);
                let store =
                    LocalObjectStore::new(root, Self::non_empty(&self.config.public_base_url))
                        .await?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "s3")]
            ProviderKind::S3 => {
                let store = super::s3::S3ObjectStore::new(super::s3::S3Settings {
                    bucket: dest.bucket.clone(),
                    region: dest.region.clone(),
                    endpoint: Self::non_empty(&self.config.endpoint),
                    force_path_style: self.config.force_path_style,
                    access_key: Self::non_empty(&self.config.access_key),
                    secret_key: Self::non_empty(&self.config.secret_key),
                    public_base_url: Self::non_empty(&self.config.public_base_url),
                    connect_timeout: Duration::from_secs(self.config.connect_timeout_seconds),
                    read_timeout: Duration::from_secs(self.config.read_timeout_seconds),
                })
                .await?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "http")]
            ProviderKind::Http => {
                let base = Self::non_empty(&self.config.public_base_url)
                    .unwrap_or_else(|| super::http::bucket_url(&dest.bucket, &dest.region));
                let store = super::http::HttpPutObjectStore::new(
                    base,
                    Duration::from_secs(self.config.connect_timeout_seconds),
                    Duration::from_secs(self.config.read_timeout_seconds),
                )?;
                Ok(Arc::new(store))
            }
            #[allow(unreachable_patterns)]
            other => Err(AppError::configuration(format!(
                "Provider '{}' is not compiled into this build",
                other.as_str()
            ))),
        }
    }
}

#[async_trait]
impl StoreResolver for ConfigStoreResolver {
    async fn resolve(&self, options: &PublishOptions) -> AppResult<Arc<dyn ObjectStore>> {
        let dest = self.destination(options)?;
        if let Some(store) = self.stores.get(&dest) {
            return Ok(Arc::clone(store.value()));
        }

        let store = self.build(&dest).await?;
        tracing::info!(
            provider = dest.provider.as_str(),
            bucket = %dest.bucket,
            region = %dest.region,
            "Object store ready"
        );
        let entry = self.stores.entry(dest).or_insert(store);
        Ok(Arc::clone(entry.value()))
    }
}

/// Bucket names become URL hosts and directory names, so only S3-style
/// names are accepted: 3-63 characters of `[a-z0-9.-]`, starting and ending
/// with a letter or digit, with no empty label.
pub fn validate_bucket(bucket: &str) -> AppResult<()> {
    let bytes = bucket.as_bytes();
    let valid = (3..=63).contains(&bytes.len())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'.' || *b == b'-')
        && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
        && !bucket.contains("..");
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid bucket name '{bucket}'")))
    }
}

/// Region names look like `eu-west-2`: a lowercase letter followed by up to
/// 31 characters of `[a-z0-9-]`.
pub fn validate_region(region: &str) -> AppResult<()> {
    let bytes = region.as_bytes();
    let valid = (1..=32).contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid region '{region}'")))
    }
}

/// Always returns the same store.
#[derive(Debug, Clone)]
pub struct FixedStoreResolver {
    store: Arc<dyn ObjectStore>,
}

impl FixedStoreResolver {
    /// Wrap a single store.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StoreResolver for FixedStoreResolver {
    async fn resolve(&self, _options: &PublishOptions) -> AppResult<Arc<dyn ObjectStore>> {
        Ok(Arc::clone(&self.store))
    }
}
