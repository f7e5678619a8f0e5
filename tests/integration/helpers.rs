//! Shared test helpers for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use slidehub_api::{AppState, ServerParts, assemble, build_app};
use slidehub_core::config::AppConfig;
use slidehub_core::config::publisher::ProviderKind;
use slidehub_core::error::AppError;
use slidehub_core::result::AppResult;
use slidehub_core::traits::generator::{GeneratedOutput, TileGenerator};
use slidehub_storage::ConfigStoreResolver;

const BOUNDARY: &str = "slidehub-test-boundary";

/// Tiles written by [`StubGenerator`], per pyramid level.
pub const STUB_TILES: &[(&str, &[&str])] = &[
    ("0", &["0_0.jpg"]),
    ("1", &["0_0.jpg"]),
    ("2", &["0_0.jpg", "1_0.jpg", "0_1.jpg", "1_1.jpg"]),
];

/// Writes a small fixed pyramid instead of running vips.
#[derive(Debug, Default)]
pub struct StubGenerator {
    pub fail: bool,
}

#[async_trait]
impl TileGenerator for StubGenerator {
    async fn generate(
        &self,
        input: &Path,
        output_dir: &Path,
        base_name: &str,
    ) -> AppResult<GeneratedOutput> {
        if self.fail {
            return Err(AppError::conversion(format!(
                "'vips' exited with code 1: {} is not a known file format",
                input.display()
            )));
        }
        let tiles = output_dir.join(format!("{base_name}_files"));
        for (level, names) in STUB_TILES {
            let dir = tiles.join(level);
            tokio::fs::create_dir_all(&dir).await?;
            for name in *names {
                tokio::fs::write(dir.join(name), b"\xFF\xD8jpeg").await?;
            }
        }
        let descriptor = output_dir.join(format!("{base_name}.dzi"));
        tokio::fs::write(&descriptor, b"<Image TileSize=\"256\" Overlap=\"1\" Format=\"jpg\"/>")
            .await?;
        let thumbnail = output_dir.join(format!("{base_name}_thumbnail.jpg"));
        tokio::fs::write(&thumbnail, b"\xFF\xD8thumb").await?;
        Ok(GeneratedOutput {
            root: output_dir.to_path_buf(),
            descriptor,
            thumbnail: Some(thumbnail),
        })
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared handler state
    pub state: AppState,
    /// Application config
    pub config: AppConfig,
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    /// Create a test application publishing to a local directory
    pub async fn new() -> Self {
        Self::with_generator(StubGenerator::default()).await
    }

    pub async fn with_generator(generator: StubGenerator) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");

        let mut config = AppConfig::default();
        config.storage.data_root = dir.path().join("data").to_string_lossy().into_owned();
        config.publisher.provider = ProviderKind::Local;
        config.publisher.local_root = dir.path().join("published").to_string_lossy().into_owned();
        config.publisher.initial_backoff_ms = 1;
        config.publisher.max_backoff_ms = 2;
        config.worker.drain_timeout_seconds = 5;

        let resolver = Arc::new(ConfigStoreResolver::new(config.publisher.clone()));
        let ServerParts { state, runner, .. } =
            assemble(config.clone(), Arc::new(generator), resolver)
                .await
                .expect("Failed to assemble server");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(runner.run(shutdown_rx));

        Self {
            router: build_app(state.clone()),
            state,
            config,
            shutdown,
            worker,
            _dir: dir,
        }
    }

    /// Directory the local provider publishes the default bucket into
    pub fn published_root(&self) -> PathBuf {
        PathBuf::from(&self.config.publisher.local_root).join(&self.config.publisher.bucket)
    }

    /// Make a JSON HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        self.send(req).await
    }

    /// Send one chunk through `POST /api/upload/chunk`
    pub async fn post_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        total_chunks: u32,
        filename: &str,
        data: &[u8],
    ) -> TestResponse {
        let form = MultipartForm::new()
            .text("session_id", session_id)
            .text("chunk_index", &chunk_index.to_string())
            .text("total_chunks", &total_chunks.to_string())
            .text("filename", filename)
            .file("chunk", "blob", data);
        self.post_form("/api/upload/chunk", form).await
    }

    /// Send a multipart form to `path`
    pub async fn post_form(&self, path: &str, form: MultipartForm) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .expect("Failed to build request");

        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Poll `GET /api/status/{job_id}` until the job is completed or failed
    pub async fn wait_for_job(&self, job_id: &str) -> Value {
        for _ in 0..500 {
            let response = self.request("GET", &format!("/api/status/{job_id}"), None).await;
            assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
            match response.body["status"].as_str() {
                Some("completed") | Some("failed") => return response.body,
                _ => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
        panic!("Job {job_id} did not finish");
    }

    /// Stop the worker and wait for it to drain
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        tokio::time::timeout(Duration::from_secs(10), self.worker)
            .await
            .expect("Worker did not stop")
            .expect("Worker panicked");
    }
}

/// Hand-built `multipart/form-data` body
#[derive(Debug, Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Count regular files below `dir`.
pub fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() { count_files(&path) } else { 1 }
        })
        .sum()
}
