//! Tile generator configuration.

use serde::{Deserialize, Serialize};

/// Settings for the external `vips` tile generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path or name of the `vips` binary.
    #[serde(default = "default_vips")]
    pub vips_binary: String,
    /// Path or name of the `vipsthumbnail` binary.
    #[serde(default = "default_vipsthumbnail")]
    pub vipsthumbnail_binary: String,
    /// Tile edge length in pixels.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Tile overlap in pixels.
    #[serde(default = "default_overlap")]
    pub overlap: u32,
    /// JPEG quality for tiles and thumbnail.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Longest edge of the thumbnail in pixels.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    /// Upper bound for a single generator run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            vips_binary: default_vips(),
            vipsthumbnail_binary: default_vipsthumbnail(),
            tile_size: default_tile_size(),
            overlap: default_overlap(),
            quality: default_quality(),
            thumbnail_size: default_thumbnail_size(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_vips() -> String {
    "vips".to_string()
}

fn default_vipsthumbnail() -> String {
    "vipsthumbnail".to_string()
}

fn default_tile_size() -> u32 {
    256
}

fn default_overlap() -> u32 {
    1
}

fn default_quality() -> u8 {
    85
}

fn default_thumbnail_size() -> u32 {
    512
}

fn default_timeout() -> u64 {
    3600
}
