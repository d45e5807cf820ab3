//! Route definitions for aggregated metric reads.

use axum::routing::get;
use axum::Router;

use crate::handlers::metrics;
use crate::state::AppState;

/// Routes mounted at `/metrics`.
///
/// ```text
/// GET    /daily      -> daily_metrics
/// GET    /summary    -> summary_stats
/// GET    /filters    -> filter_options
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily", get(metrics::daily_metrics))
        .route("/summary", get(metrics::summary_stats))
        .route("/filters", get(metrics::filter_options))
}
