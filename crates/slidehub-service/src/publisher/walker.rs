//! Enumerates generated files into publish tasks.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;
use slidehub_entity::publish::PublishTask;

/// Walk `root` on the blocking pool and build one task per regular file.
pub async fn collect_tasks(root: &Path, key_prefix: &str) -> AppResult<Vec<PublishTask>> {
    let root = root.to_path_buf();
    let prefix = key_prefix.trim_matches('/').to_string();
    tokio::task::spawn_blocking(move || walk(&root, &prefix))
        .await
        .map_err(|e| AppError::internal(format!("File enumeration task failed: {e}")))?
}

fn walk(root: &Path, prefix: &str) -> AppResult<Vec<PublishTask>> {
    if !root.is_dir() {
        return Err(AppError::not_found(format!(
            "Output directory {} does not exist",
            root.display()
        )));
    }

    let mut tasks = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to enumerate {}", path.display()),
                e,
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to stat {}", entry.path().display()),
                    e,
                )
            })?
            .len();
        let key = object_key(prefix, root, entry.path());
        tasks.push(PublishTask::new(PathBuf::from(entry.path()), key, size));
    }

    tracing::debug!(root = %root.display(), files = tasks.len(), "Enumerated publish tasks");
    Ok(tasks)
}

/// `<prefix>/<path relative to root>` with `/` separators.
fn object_key(prefix: &str, root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if prefix.is_empty() {
        relative
    } else {
        format!("{prefix}/{relative}")
    }
}
