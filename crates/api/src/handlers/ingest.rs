//! Handler for report row ingestion.
//!
//! Accepts rows already parsed out of an uploaded report by an external
//! collaborator. Duplicate rows are the expected, idempotent path; one
//! bad row never fails the batch.

use adops_core::report::RawRow;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use adops_db::repositories::MetricRowRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `POST /api/v1/ingest`.
#[derive(Debug, Deserialize)]
pub struct IngestQuery {
    /// Name of the report file the rows came from, recorded as
    /// ingestion metadata.
    pub source_file: Option<String>,
}

/// POST /api/v1/ingest
///
/// Upsert a batch of parsed report rows into the metric row store.
/// Returns the per-batch counts; 400 when the body is empty.
pub async fn ingest_rows(
    State(state): State<AppState>,
    Query(params): Query<IngestQuery>,
    Json(rows): Json<Vec<RawRow>>,
) -> AppResult<impl IntoResponse> {
    if rows.is_empty() {
        return Err(AppError::BadRequest("No rows provided".into()));
    }

    let summary =
        MetricRowRepo::ingest(&state.pool, &rows, params.source_file.as_deref()).await?;

    Ok(Json(DataResponse { data: summary }))
}
