//! Job status handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use slidehub_core::error::AppError;
use slidehub_entity::job::Job;

use crate::dto::response::JobListResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/status/{job_id}
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    // Anything that is not a known id, well-formed or not, is simply absent.
    let id = Uuid::parse_str(&job_id)
        .map_err(|_| AppError::not_found(format!("Job {job_id} not found")))?;
    Ok(Json(state.registry().get(id)?))
}

/// GET /api/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.registry().list(),
    })
}
