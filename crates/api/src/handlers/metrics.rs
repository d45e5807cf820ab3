//! Handlers for aggregated metric reads (dashboard KPIs and filters).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use adops_db::models::metric_row::{DateRange, FilterOptions, MetricFilter};
use adops_db::repositories::MetricRowRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/metrics/daily
///
/// One row per day over the requested range with summed measures and
/// derived CTR/CPC/ACOS/ROAS, optionally filtered by dimension.
pub async fn daily_metrics(
    State(state): State<AppState>,
    Query(filter): Query<MetricFilter>,
) -> AppResult<impl IntoResponse> {
    let metrics = MetricRowRepo::daily_metrics(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: metrics }))
}

/// GET /api/v1/metrics/summary
///
/// Whole-range totals with the same derived ratios.
pub async fn summary_stats(
    State(state): State<AppState>,
    Query(filter): Query<MetricFilter>,
) -> AppResult<impl IntoResponse> {
    let summary = MetricRowRepo::summary_stats(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// Response payload for the filters endpoint.
#[derive(Debug, Serialize)]
pub struct FiltersResponse {
    pub filters: FilterOptions,
    pub date_range: DateRange,
}

/// GET /api/v1/metrics/filters
///
/// Distinct values for every filterable dimension plus the ingested
/// date range.
pub async fn filter_options(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let filters = MetricRowRepo::filter_options(&state.pool).await?;
    let date_range = MetricRowRepo::date_range(&state.pool).await?;
    Ok(Json(DataResponse {
        data: FiltersResponse {
            filters,
            date_range,
        },
    }))
}
