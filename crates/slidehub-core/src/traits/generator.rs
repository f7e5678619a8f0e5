//! Tile generator trait for producing Deep Zoom pyramids.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::result::AppResult;

/// Files produced by one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    /// Directory containing everything that should be published.
    pub root: PathBuf,
    /// Path of the `.dzi` descriptor inside `root`.
    pub descriptor: PathBuf,
    /// Path of the thumbnail inside `root`, when one was produced.
    pub thumbnail: Option<PathBuf>,
}

/// Converts a slide image into a tiled pyramid on local disk.
#[async_trait]
pub trait TileGenerator: Send + Sync + std::fmt::Debug + 'static {
    /// Convert `input` into `output_dir/{base_name}.dzi` plus the
    /// `{base_name}_files/` tile tree.
    async fn generate(
        &self,
        input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> AppResult<GeneratedOutput>;
}
