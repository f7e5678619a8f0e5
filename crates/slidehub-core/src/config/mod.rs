//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a default so an empty file is valid.

pub mod app;
pub mod converter;
pub mod logging;
pub mod publisher;
pub mod session;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::converter::ConverterConfig;
use self::logging::LoggingConfig;
use self::publisher::PublisherConfig;
use self::session::SessionConfig;
use self::storage::StorageConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Local working storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload session lifetime settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Object-store publisher settings.
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// Tile generator settings.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Pipeline worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default.toml` with the `config/{env}.toml` overlay and
    /// environment variables prefixed with `SLIDEHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SLIDEHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(AppError::from)
    }
}
