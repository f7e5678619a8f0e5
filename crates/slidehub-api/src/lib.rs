//! # slidehub-api
//!
//! HTTP surface for SlideHub built on Axum: chunk upload, upload
//! completion, job status, and health endpoints, plus the server
//! bootstrap that wires storage, the pipeline, and the worker together.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{ServerParts, assemble, build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
