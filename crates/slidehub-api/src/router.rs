//! Route definitions for the SlideHub HTTP API.
//!
//! Upload, job, and health routes are mounted under `/api`; the service
//! banner lives at `/`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload =
        usize::try_from(state.config.storage.max_upload_size_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(upload_routes())
        .merge(job_routes())
        .merge(health_routes());

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .route("/", get(handlers::health::index))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Chunked and single-request uploads
fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::upload::upload_file))
        .route("/upload/chunk", post(handlers::upload::upload_chunk))
        .route("/upload/complete", post(handlers::upload::complete_upload))
        .route(
            "/upload/status/{session_id}",
            get(handlers::upload::upload_status),
        )
}

/// Conversion job status
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/status/{job_id}", get(handlers::jobs::job_status))
        .route("/jobs", get(handlers::jobs::list_jobs))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
