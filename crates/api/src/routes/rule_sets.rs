//! Route definitions for the rule set registry.

use axum::routing::get;
use axum::Router;

use crate::handlers::rule_sets;
use crate::state::AppState;

/// Routes mounted at `/rule-sets`.
///
/// ```text
/// GET    /                 -> list_rule_sets
/// GET    /{name}           -> get_rule_set
/// PUT    /{name}           -> put_rule_set (atomic upsert / import)
/// GET    /{name}/export    -> export_rule_set (raw document)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rule_sets::list_rule_sets))
        .route(
            "/{name}",
            get(rule_sets::get_rule_set).put(rule_sets::put_rule_set),
        )
        .route("/{name}/export", get(rule_sets::export_rule_set))
}
