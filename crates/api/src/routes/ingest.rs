//! Route definitions for report ingestion.

use axum::routing::post;
use axum::Router;

use crate::handlers::ingest;
use crate::state::AppState;

/// Routes mounted at `/ingest`.
///
/// ```text
/// POST   /    -> ingest_rows
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(ingest::ingest_rows))
}
