//! Handlers for the `/jobs` resource.
//!
//! A job is created from user-approved actions and materialized
//! asynchronously by the background worker; these handlers only create,
//! inspect, and serve the output of jobs.

use std::path::Path as FsPath;

use adops_core::error::CoreError;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use adops_db::models::bulk_job::{BulkJob, SubmitBulkJob};
use adops_db::models::status::BulkJobStatus;
use adops_db::repositories::bulk_job_repo::JobScope;
use adops_db::repositories::BulkJobRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

/// Job view returned by the API: status by name, with an
/// `output_available` flag instead of the raw file path.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub status: &'static str,
    pub account_id: Option<String>,
    pub date_from: Option<chrono::NaiveDate>,
    pub date_to: Option<chrono::NaiveDate>,
    pub rule_set_name: Option<String>,
    pub summary: serde_json::Value,
    pub error_message: Option<String>,
    pub output_available: bool,
    pub created_at: adops_core::types::Timestamp,
    pub updated_at: adops_core::types::Timestamp,
}

fn job_response(job: BulkJob) -> JobResponse {
    let status = BulkJobStatus::from_id(job.status_id);
    let output_available = status == Some(BulkJobStatus::Completed)
        && job
            .output_path
            .as_deref()
            .is_some_and(|p| FsPath::new(p).exists());
    JobResponse {
        id: job.id,
        status: status.map(BulkJobStatus::name).unwrap_or("unknown"),
        account_id: job.account_id,
        date_from: job.date_from,
        date_to: job.date_to,
        rule_set_name: job.rule_set_name,
        summary: job.summary,
        error_message: job.error_message,
        output_available,
        created_at: job.created_at,
        updated_at: job.updated_at,
    }
}

/// Fetch a job by ID or return 404.
async fn find_job(pool: &sqlx::PgPool, job_id: Uuid) -> AppResult<BulkJob> {
    BulkJobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "BulkJob",
            id: job_id.to_string(),
        }))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Submit a set of user-approved actions as a new bulk job. Returns 201
/// with the job in `created` status; the background materializer picks
/// it up from there. 400 when the action list is empty.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitBulkJob>,
) -> AppResult<impl IntoResponse> {
    if input.actions.is_empty() {
        return Err(AppError::BadRequest("No actions provided".into()));
    }

    let actions = serde_json::to_value(&input.actions)
        .map_err(|e| AppError::InternalError(format!("Failed to encode actions: {e}")))?;
    let summary = serde_json::json!({ "total_actions": input.actions.len() });
    let scope = JobScope {
        account_id: input.account_id.as_deref(),
        date_from: input.date_from,
        date_to: input.date_to,
        rule_set_name: input.rule_set.as_deref(),
    };

    let job = BulkJobRepo::create(&state.pool, &actions, &summary, &scope).await?;

    tracing::info!(
        job_id = %job.id,
        total_actions = input.actions.len(),
        "Bulk job submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: job_response(job),
        }),
    ))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// List jobs newest first. Supports `limit` and `offset`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<crate::query::PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let jobs = BulkJobRepo::list(&state.pool, params.limit, params.offset).await?;
    let jobs: Vec<JobResponse> = jobs.into_iter().map(job_response).collect();
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/{id}
///
/// Get a single job by ID, reporting whether its output is available
/// for download.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job = find_job(&state.pool, job_id).await?;
    Ok(Json(DataResponse {
        data: job_response(job),
    }))
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}/download
///
/// Stream the job's bulk sheet. Only valid while the job is completed
/// and the file still exists; anything else is a 404.
pub async fn download_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Response> {
    let job = find_job(&state.pool, job_id).await?;

    let not_found = || {
        AppError::Core(CoreError::NotFound {
            entity: "BulkJobOutput",
            id: job_id.to_string(),
        })
    };

    if BulkJobStatus::from_id(job.status_id) != Some(BulkJobStatus::Completed) {
        return Err(not_found());
    }
    let output_path = job.output_path.ok_or_else(not_found)?;

    let file = tokio::fs::File::open(&output_path)
        .await
        .map_err(|_| not_found())?;
    let stream = ReaderStream::new(file);

    let filename = FsPath::new(&output_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("bulk_{job_id}.csv"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(format!("Failed to build download response: {e}")))
}
