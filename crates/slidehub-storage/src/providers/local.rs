//! Local filesystem object store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use slidehub_core::error::{AppError, ErrorKind};
use slidehub_core::result::AppResult;
use slidehub_core::traits::object_store::{MultipartOptions, ObjectStore};

/// Publishes objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    /// Root directory for all stored objects.
    root: PathBuf,
    /// Base URL prepended to keys when building object URLs.
    base_url: Option<String>,
}

impl LocalObjectStore {
    /// Create a store rooted at the given path.
    pub async fn new(root_path: impl Into<PathBuf>, base_url: Option<String>) -> AppResult<Self> {
        let root = root_path.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create object root: {}", root.display()),
                e,
            )
        })?;
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        Ok(Self { root, base_url })
    }

    /// Root directory objects are written under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object key to a path within the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let clean = key.trim_start_matches('/');
        if clean.split('/').any(|part| part == "..") {
            return Err(AppError::validation(format!("Invalid object key: {key}")));
        }
        Ok(self.root.join(clean))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.is_dir())
    }

    async fn put_object(&self, key: &str, body: Bytes, _content_type: &str) -> AppResult<()> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &body).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to write object: {key}"), e)
        })?;

        debug!(key, bytes = body.len(), "Stored object");
        Ok(())
    }

    async fn put_multipart(
        &self,
        key: &str,
        path: &Path,
        _content_type: &str,
        _options: &MultipartOptions,
    ) -> AppResult<u64> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        let copied = fs::copy(path, &full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to copy {} -> {key}", path.display()),
                e,
            )
        })?;

        debug!(key, bytes = copied, "Stored large object");
        Ok(copied)
    }

    fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match &self.base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("file://{}", self.root.join(key).display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), Some("http://cdn.test/".into()))
            .await
            .unwrap();

        store
            .put_object("dzi/j1/a.dzi", Bytes::from_static(b"<Image/>"), "application/xml")
            .await
            .unwrap();
        let stored = std::fs::read(dir.path().join("dzi/j1/a.dzi")).unwrap();
        assert_eq!(stored, b"<Image/>");
        assert_eq!(store.object_url("dzi/j1/a.dzi"), "http://cdn.test/dzi/j1/a.dzi");
    }

    #[tokio::test]
    async fn test_multipart_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("big.bin");
        std::fs::write(&src, vec![7u8; 4096]).unwrap();

        let store = LocalObjectStore::new(dir.path().join("out"), None).await.unwrap();
        let sent = store
            .put_multipart("k/big.bin", &src, "application/octet-stream", &MultipartOptions::default())
            .await
            .unwrap();
        assert_eq!(sent, 4096);
        assert!(store.object_url("k/big.bin").starts_with("file://"));
    }

    #[tokio::test]
    async fn test_parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), None).await.unwrap();
        let err = store
            .put_object("../escape", Bytes::new(), "text/plain")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
