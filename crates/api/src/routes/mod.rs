pub mod health;
pub mod ingest;
pub mod jobs;
pub mod metrics;
pub mod rule_sets;
pub mod suggestions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ingest                      upsert parsed report rows (POST)
///
/// /metrics/daily               per-day KPIs over a range (GET)
/// /metrics/summary             whole-range totals (GET)
/// /metrics/filters             filter dropdown values + date range (GET)
///
/// /rule-sets                   list summaries (GET)
/// /rule-sets/{name}            get, atomic upsert (GET, PUT)
/// /rule-sets/{name}/export     raw document for re-import (GET)
///
/// /suggestions                 evaluate a rule set over a window (POST)
///
/// /jobs                        list, submit (GET, POST)
/// /jobs/{id}                   job status + summary (GET)
/// /jobs/{id}/download          the generated bulk sheet (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Report ingestion into the metric row store.
        .nest("/ingest", ingest::router())
        // Aggregated dashboard reads.
        .nest("/metrics", metrics::router())
        // Rule set registry (edit, import/export).
        .nest("/rule-sets", rule_sets::router())
        // Suggestion evaluation.
        .nest("/suggestions", suggestions::router())
        // Bulk job lifecycle and downloads.
        .nest("/jobs", jobs::router())
}
