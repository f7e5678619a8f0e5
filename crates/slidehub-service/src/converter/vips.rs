//! libvips-backed Deep Zoom generator.
//!
//! Runs `vips dzsave` for the tile pyramid and `vipsthumbnail` for the
//! preview image as child processes. A failed thumbnail does not fail the
//! conversion.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use slidehub_core::config::converter::ConverterConfig;
use slidehub_core::result::AppResult;
use slidehub_core::traits::generator::{GeneratedOutput, TileGenerator};

use super::error::GeneratorError;

/// Longest stderr excerpt carried in an error.
const STDERR_LIMIT: usize = 2000;

/// [`TileGenerator`] that shells out to the libvips command-line tools.
#[derive(Debug, Clone)]
pub struct VipsTileGenerator {
    config: ConverterConfig,
}

impl VipsTileGenerator {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Arguments for `vips dzsave`.
    pub fn dzsave_args(&self, input: &Path, output_base: &Path) -> Vec<OsString> {
        vec![
            "dzsave".into(),
            input.into(),
            output_base.into(),
            "--tile-size".into(),
            self.config.tile_size.to_string().into(),
            "--overlap".into(),
            self.config.overlap.to_string().into(),
            "--suffix".into(),
            format!(".jpg[Q={}]", self.config.quality).into(),
        ]
    }

    /// Arguments for `vipsthumbnail`.
    pub fn thumbnail_args(&self, input: &Path, thumbnail: &Path) -> Vec<OsString> {
        vec![
            input.into(),
            "-s".into(),
            self.config.thumbnail_size.to_string().into(),
            "-o".into(),
            format!("{}[Q={}]", thumbnail.display(), self.config.quality).into(),
        ]
    }

    async fn run(&self, program: &str, args: &[OsString]) -> Result<Duration, GeneratorError> {
        let start = Instant::now();
        tracing::debug!(program, ?args, "Running generator command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| GeneratorError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let timeout_seconds = self.config.timeout_seconds;
        let output = tokio::time::timeout(Duration::from_secs(timeout_seconds), child.wait_with_output())
            .await
            .map_err(|_| GeneratorError::Timeout {
                program: program.to_string(),
                timeout_seconds,
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::Failed {
                program: program.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().chars().take(STDERR_LIMIT).collect(),
            });
        }
        Ok(start.elapsed())
    }
}

#[async_trait]
impl TileGenerator for VipsTileGenerator {
    async fn generate(
        &self,
        input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> AppResult<GeneratedOutput> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(GeneratorError::from)?;

        let output_base = output_dir.join(base_name);
        let descriptor = output_dir.join(format!("{base_name}.dzi"));
        let elapsed = self
            .run(&self.config.vips_binary, &self.dzsave_args(input, &output_base))
            .await?;
        if !tokio::fs::try_exists(&descriptor).await.unwrap_or(false) {
            return Err(GeneratorError::OutputMissing { path: descriptor }.into());
        }
        tracing::info!(
            input = %input.display(),
            descriptor = %descriptor.display(),
            elapsed_ms = elapsed.as_millis() as u64,
            "DZI pyramid generated"
        );

        let thumbnail_path: PathBuf = output_dir.join(format!("{base_name}_thumbnail.jpg"));
        let thumbnail = match self
            .run(
                &self.config.vipsthumbnail_binary,
                &self.thumbnail_args(input, &thumbnail_path),
            )
            .await
        {
            Ok(_) if thumbnail_path.exists() => Some(thumbnail_path),
            Ok(_) => {
                tracing::warn!(path = %thumbnail_path.display(), "Thumbnail command produced no file");
                None
            }
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "Thumbnail generation failed");
                None
            }
        };

        Ok(GeneratedOutput {
            root: output_dir.to_path_buf(),
            descriptor,
            thumbnail,
        })
    }
}
