//! Handlers for the rule set registry.
//!
//! Writes are atomic full-document replacements validated up front, so a
//! malformed import can never leave the registry partially updated.

use adops_core::error::CoreError;
use adops_core::rules::CategoryRules;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use adops_db::models::rule_set::{RuleSetRow, RuleSetSummary};
use adops_db::repositories::RuleSetRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Fetch a rule set row or return 404.
async fn find_rule_set(pool: &sqlx::PgPool, name: &str) -> AppResult<RuleSetRow> {
    RuleSetRepo::get(pool, name)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "RuleSet",
            id: name.to_string(),
        }))
}

/// GET /api/v1/rule-sets
///
/// List rule set summaries (name, version, rule count).
pub async fn list_rule_sets(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rows = RuleSetRepo::list(&state.pool).await?;
    let summaries: Vec<RuleSetSummary> = rows.iter().map(RuleSetSummary::from_row).collect();
    Ok(Json(DataResponse { data: summaries }))
}

/// GET /api/v1/rule-sets/{name}
///
/// Fetch a rule set with its full document.
pub async fn get_rule_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let row = find_rule_set(&state.pool, &name).await?;
    Ok(Json(DataResponse { data: row }))
}

/// PUT /api/v1/rule-sets/{name}
///
/// Validate and atomically upsert a full rule set document. Serves as
/// both edit and import; 400 on any structural violation, leaving the
/// stored document untouched.
pub async fn put_rule_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(document): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("Rule set name must not be empty".into()));
    }
    // Full structural validation before anything is written.
    CategoryRules::from_document(&document)?;

    let row = RuleSetRepo::put(&state.pool, &name, &document).await?;

    tracing::info!(
        rule_set = %row.name,
        version = row.version,
        "Rule set replaced"
    );
    Ok(Json(DataResponse { data: row }))
}

/// GET /api/v1/rule-sets/{name}/export
///
/// The raw rule set document, suitable for re-import via PUT.
pub async fn export_rule_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let row = find_rule_set(&state.pool, &name).await?;
    Ok(Json(row.document))
}
