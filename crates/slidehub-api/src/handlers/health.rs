//! Health check and service banner handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{EndpointInfo, HealthResponse, ServiceInfo};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        queue_depth: state.queue.depth(),
        active_sessions: state.sessions().len(),
    })
}

/// GET /
pub async fn index() -> Json<ServiceInfo> {
    let endpoints = [
        ("POST", "/api/upload/chunk", "Upload one chunk of a file"),
        ("POST", "/api/upload/complete", "Reassemble an upload and queue conversion"),
        ("GET", "/api/upload/status/{session_id}", "Chunk upload progress"),
        ("POST", "/api/upload", "Upload a whole file and queue conversion"),
        ("GET", "/api/status/{job_id}", "Conversion job status"),
        ("GET", "/api/jobs", "All conversion jobs"),
        ("GET", "/api/health", "Health check"),
    ]
    .into_iter()
    .map(|(method, path, description)| EndpointInfo {
        method: method.to_string(),
        path: path.to_string(),
        description: description.to_string(),
    })
    .collect();

    Json(ServiceInfo {
        service: "SlideHub DZI conversion API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}
