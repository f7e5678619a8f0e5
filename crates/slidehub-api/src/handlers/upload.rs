//! Chunked and single-request upload handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use bytes::Bytes;

use slidehub_entity::upload::{ChunkReceipt, SessionStatus};

use crate::dto::request::{ChunkUploadForm, CompleteUploadRequest, PublishQuery};
use crate::dto::response::SubmissionResponse;
use crate::error::ApiError;
use crate::handlers::validate_request;
use crate::state::AppState;

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::validation(format!("Multipart error: {e}"))
}

fn parse_index(name: &str, raw: &str) -> Result<u32, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("{name} must be a non-negative integer, got '{raw}'")))
}

/// POST /api/upload/chunk
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChunkReceipt>, ApiError> {
    let mut session_id: Option<String> = None;
    let mut chunk_index: Option<u32> = None;
    let mut total_chunks: Option<u32> = None;
    let mut filename: Option<String> = None;
    let mut payload: Option<Bytes> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "session_id" => session_id = Some(field.text().await.map_err(multipart_error)?),
            "chunk_index" => {
                chunk_index = Some(parse_index(
                    "chunk_index",
                    &field.text().await.map_err(multipart_error)?,
                )?)
            }
            "total_chunks" => {
                total_chunks = Some(parse_index(
                    "total_chunks",
                    &field.text().await.map_err(multipart_error)?,
                )?)
            }
            "filename" => filename = Some(field.text().await.map_err(multipart_error)?),
            "chunk" => payload = Some(field.bytes().await.map_err(multipart_error)?),
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown multipart field");
            }
        }
    }

    let missing = |field: &str| ApiError::validation(format!("Missing field '{field}'"));
    let form = ChunkUploadForm {
        session_id: session_id.ok_or_else(|| missing("session_id"))?,
        chunk_index: chunk_index.ok_or_else(|| missing("chunk_index"))?,
        total_chunks: total_chunks.ok_or_else(|| missing("total_chunks"))?,
        filename: filename.ok_or_else(|| missing("filename"))?,
    };
    validate_request(&form)?;
    let payload = payload.ok_or_else(|| missing("chunk"))?;

    let receipt = state
        .sessions()
        .receive_chunk(
            &form.session_id,
            form.chunk_index,
            form.total_chunks,
            &form.filename,
            payload,
        )
        .await?;

    Ok(Json(receipt))
}

/// POST /api/upload/complete
pub async fn complete_upload(
    State(state): State<AppState>,
    body: Result<Json<CompleteUploadRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    validate_request(&req)?;

    let submission = state
        .orchestrator
        .submit(&req.session_id, req.publish_options())
        .await?;

    tracing::info!(
        session_id = %req.session_id,
        job_id = %submission.job_id,
        "Upload completed and queued"
    );
    Ok(Json(submission.into()))
}

/// GET /api/upload/status/{session_id}
pub async fn upload_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatus>, ApiError> {
    let status = state.sessions().query_status(&session_id).await?;
    Ok(Json(status))
}

/// POST /api/upload
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<PublishQuery>,
    mut multipart: Multipart,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ApiError::validation("No filename provided"))?;
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or_else(|| ApiError::validation("No file provided"))?;
    let submission = state
        .orchestrator
        .submit_file(&filename, data, query.into())
        .await?;

    Ok(Json(submission.into()))
}
