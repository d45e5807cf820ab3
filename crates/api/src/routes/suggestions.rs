//! Route definitions for suggestion evaluation.

use axum::routing::post;
use axum::Router;

use crate::handlers::suggestions;
use crate::state::AppState;

/// Routes mounted at `/suggestions`.
///
/// ```text
/// POST   /    -> generate_suggestions
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(suggestions::generate_suggestions))
}
