//! Indexing job API handlers
//!
//! POST /index/start, GET /index/status/:job_id, POST /index/cancel/:job_id,
//! GET /index/jobs, GET /index/albums/:job_id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{AlbumRecord, IndexingJob, JobStatus},
    AppState,
};

/// POST /index/start request
#[derive(Debug, Deserialize)]
pub struct StartIndexingRequest {
    /// Defaults to the configured library root when omitted
    #[serde(default)]
    pub library_root: Option<String>,
}

/// POST /index/start response
#[derive(Debug, Serialize, Deserialize)]
pub struct StartIndexingResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// POST /index/cancel response
#[derive(Debug, Serialize, Deserialize)]
pub struct CancelIndexingResponse {
    pub job_id: Uuid,
    pub cancelled: bool,
}

/// POST /index/start
///
/// Queue an indexing job. Returns 202 Accepted with the job ID; the walk runs
/// in the background.
pub async fn start_indexing(
    State(state): State<AppState>,
    Json(request): Json<StartIndexingRequest>,
) -> ApiResult<(StatusCode, Json<StartIndexingResponse>)> {
    let library_root = request
        .library_root
        .filter(|root| !root.trim().is_empty())
        .or_else(|| {
            state
                .default_library_root
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
        })
        .ok_or_else(|| ApiError::BadRequest("library_root is required".to_string()))?;

    let job_id = state.controller.start_indexing_job(&library_root).await?;

    tracing::info!(job_id = %job_id, root = %library_root, "Indexing job accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(StartIndexingResponse {
            job_id,
            status: JobStatus::Queued,
        }),
    ))
}

/// GET /index/status/:job_id
///
/// Snapshot of the job, including warnings collected so far.
pub async fn get_indexing_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<IndexingJob>> {
    Ok(Json(state.controller.get_job_status(job_id).await?))
}

/// POST /index/cancel/:job_id
pub async fn cancel_indexing(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<CancelIndexingResponse>> {
    state.controller.cancel_job(job_id).await?;
    Ok(Json(CancelIndexingResponse {
        job_id,
        cancelled: true,
    }))
}

/// GET /index/jobs
pub async fn list_indexing_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<IndexingJob>>> {
    Ok(Json(state.controller.list_jobs().await?))
}

/// GET /index/albums/:job_id
pub async fn list_indexed_albums(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AlbumRecord>>> {
    Ok(Json(state.controller.albums(job_id).await?))
}

/// Build indexing routes
pub fn indexing_routes() -> Router<AppState> {
    Router::new()
        .route("/index/start", post(start_indexing))
        .route("/index/status/:job_id", get(get_indexing_status))
        .route("/index/cancel/:job_id", post(cancel_indexing))
        .route("/index/jobs", get(list_indexing_jobs))
        .route("/index/albums/:job_id", get(list_indexed_albums))
}
