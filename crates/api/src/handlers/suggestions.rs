//! Handler for suggestion evaluation.
//!
//! Loads pre-aggregated summaries for the requested window, resolves the
//! rule set (default "Balanced"), and runs the pure evaluator. Nothing
//! here is persisted; the caller submits the actions it approves of back
//! through the jobs resource.

use adops_core::error::CoreError;
use adops_core::rules::{CategoryRules, RuleSet, DEFAULT_RULE_SET_NAME};
use adops_core::suggest::{
    self, AnalysisInput, CampaignSummary, PlacementSummary, SearchTermSummary, Suggestion,
    TargetEntity, TargetSummary, Thresholds,
};
use adops_core::metrics::MetricSnapshot;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use adops_db::models::metric_row::{CampaignAgg, PlacementAgg, SearchTermAgg, TargetAgg};
use adops_db::repositories::{MetricRowRepo, RuleSetRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request payload for `POST /api/v1/suggestions`.
#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub account_id: Option<String>,
    pub portfolio_id: Option<i64>,
    /// Rule set name; defaults to "Balanced".
    pub rule_set: Option<String>,
    /// Optional partial overrides of the built-in thresholds.
    #[serde(default)]
    pub thresholds: Thresholds,
}

/// Response payload: the generated suggestions.
#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

/// POST /api/v1/suggestions
///
/// Evaluate the resolved rule set against the window's aggregates and
/// return categorized suggestions with their candidate bulk actions.
pub async fn generate_suggestions(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> AppResult<impl IntoResponse> {
    let name = request
        .rule_set
        .as_deref()
        .unwrap_or(DEFAULT_RULE_SET_NAME);
    let row = RuleSetRepo::get(&state.pool, name)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "RuleSet",
            id: name.to_string(),
        }))?;
    // Stored documents were validated on write.
    let rules: CategoryRules = serde_json::from_value(row.document).map_err(|e| {
        AppError::InternalError(format!("Stored rule set '{name}' is unreadable: {e}"))
    })?;
    let rule_set = RuleSet {
        name: row.name,
        version: row.version,
        rules,
    };

    let account = request.account_id.as_deref();
    let portfolio = request.portfolio_id;
    let campaigns = MetricRowRepo::campaign_summaries(
        &state.pool,
        request.date_from,
        request.date_to,
        account,
        portfolio,
    )
    .await?;
    let targets = MetricRowRepo::target_summaries(
        &state.pool,
        request.date_from,
        request.date_to,
        account,
        portfolio,
    )
    .await?;
    let search_terms = MetricRowRepo::search_term_summaries(
        &state.pool,
        request.date_from,
        request.date_to,
        account,
        portfolio,
    )
    .await?;
    let placements = MetricRowRepo::placement_summaries(
        &state.pool,
        request.date_from,
        request.date_to,
        account,
        portfolio,
    )
    .await?;

    let input = build_input(campaigns, targets, search_terms, placements);
    let suggestions = suggest::evaluate(&input, &rule_set, &request.thresholds);

    Ok(Json(DataResponse {
        data: SuggestionsResponse { suggestions },
    }))
}

/// Assemble the evaluator input from the aggregate rows.
fn build_input(
    campaigns: Vec<CampaignAgg>,
    targets: Vec<TargetAgg>,
    search_terms: Vec<SearchTermAgg>,
    placements: Vec<PlacementAgg>,
) -> AnalysisInput {
    // Terms already running as exact keywords, for harvest dedup.
    let existing_exact_keywords: Vec<String> = targets
        .iter()
        .filter(|t| {
            t.match_type
                .as_deref()
                .is_some_and(|mt| mt.eq_ignore_ascii_case("exact"))
        })
        .map(|t| t.target_value.clone())
        .collect();

    let campaigns = campaigns
        .into_iter()
        .map(|c| CampaignSummary {
            campaign_id: c.campaign_id,
            name: c.campaign_name.unwrap_or_default(),
            portfolio_id: c.portfolio_id,
            portfolio_name: c.portfolio_name,
            daily_budget: c.campaign_budget.unwrap_or(0.0),
            asin: None,
            sku: None,
            metrics: snapshot(c.impressions, c.clicks, c.spend, c.sales, c.orders, c.units),
        })
        .collect();

    let targets = targets
        .into_iter()
        .map(|t| {
            let metrics = snapshot(t.impressions, t.clicks, t.spend, t.sales, t.orders, t.units);
            let entity = infer_target_entity(&t.target_value);
            let (keyword_text, expression) = match entity {
                TargetEntity::Keyword => (t.target_value, String::new()),
                TargetEntity::ProductTargeting => (String::new(), t.target_value),
            };
            TargetSummary {
                entity: Some(entity),
                campaign_id: t.campaign_id,
                campaign_name: t.campaign_name.unwrap_or_default(),
                ad_group_id: t.ad_group_id,
                ad_group_name: t.ad_group_name.unwrap_or_default(),
                keyword_text,
                match_type: t.match_type.unwrap_or_default(),
                product_targeting_expression: expression,
                // The row store carries no live bid; the observed average
                // CPC is the closest stand-in for scaling updates.
                bid: metrics.cpc(),
                enabled: true,
                metrics,
            }
        })
        .collect();

    let search_terms = search_terms
        .into_iter()
        .map(|st| SearchTermSummary {
            search_term: st.search_term,
            campaign_id: st.campaign_id,
            campaign_name: st.campaign_name.unwrap_or_default(),
            ad_group_id: st.ad_group_id,
            ad_group_name: st.ad_group_name.unwrap_or_default(),
            source_type: st.match_type.unwrap_or_else(|| "unknown".into()),
            metrics: snapshot(
                st.impressions,
                st.clicks,
                st.spend,
                st.sales,
                st.orders,
                st.units,
            ),
        })
        .collect();

    let placements = placements
        .into_iter()
        .map(|p| PlacementSummary {
            campaign_id: p.campaign_id,
            placement: p.placement,
            // Adjustment percentages are not part of performance
            // reports; absent data reads as no current boost.
            percentage: 0.0,
            metrics: snapshot(p.impressions, p.clicks, p.spend, p.sales, p.orders, p.units),
        })
        .collect();

    AnalysisInput {
        evaluation_date: Some(Utc::now().date_naive()),
        campaigns,
        targets,
        placements,
        search_terms,
        existing_exact_keywords,
        existing_negatives: Vec::new(),
    }
}

fn snapshot(
    impressions: i64,
    clicks: i64,
    spend: f64,
    sales: f64,
    orders: i64,
    units: i64,
) -> MetricSnapshot {
    MetricSnapshot {
        impressions,
        clicks,
        spend,
        sales,
        orders,
        units,
    }
}

/// Product targets carry an ASIN-style expression as their target value;
/// everything else is a keyword.
fn infer_target_entity(target_value: &str) -> TargetEntity {
    let lower = target_value.to_lowercase();
    if lower.contains("asin") || target_value.starts_with("B0") {
        TargetEntity::ProductTargeting
    } else {
        TargetEntity::Keyword
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_entity_inference() {
        assert_eq!(
            infer_target_entity("asin=\"B0ABCDEFGH\""),
            TargetEntity::ProductTargeting
        );
        assert_eq!(infer_target_entity("B0ABCDEFGH"), TargetEntity::ProductTargeting);
        assert_eq!(infer_target_entity("wireless charger"), TargetEntity::Keyword);
    }
}
