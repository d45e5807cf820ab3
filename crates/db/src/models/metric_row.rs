//! Metric row store models: ingestion results, query filters, and the
//! aggregate row shapes the reporting and evaluator queries return.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Outcome of one ingestion batch. The batch never fails as a whole:
/// invalid rows are skipped and counted, everything else is upserted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub parsed: u64,
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

/// Date range plus optional dimension filters for metric queries.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricFilter {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub account_id: Option<String>,
    pub portfolio_id: Option<i64>,
    pub campaign_id: Option<i64>,
    pub ad_group_id: Option<i64>,
    pub ad_product: Option<String>,
    pub placement: Option<String>,
    pub match_type: Option<String>,
}

/// One day of summed measures with derived KPIs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub ctr: f64,
    pub cpc: f64,
    pub acos: f64,
    pub roas: f64,
}

/// Whole-range totals with derived KPIs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SummaryStats {
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub ctr: f64,
    pub cpc: f64,
    pub acos: f64,
    pub roas: f64,
}

/// A distinct account for filter dropdowns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountOption {
    pub id: String,
    pub name: Option<String>,
}

/// A distinct portfolio or campaign for filter dropdowns.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityOption {
    pub id: i64,
    pub name: Option<String>,
}

/// Distinct values for every filterable dimension.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    pub accounts: Vec<AccountOption>,
    pub portfolios: Vec<EntityOption>,
    pub campaigns: Vec<EntityOption>,
    pub ad_products: Vec<String>,
    pub match_types: Vec<String>,
}

/// Minimum and maximum ingested dates.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DateRange {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Evaluator input aggregates
// ---------------------------------------------------------------------------

/// Per-campaign sums over the evaluation window.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignAgg {
    pub campaign_id: i64,
    pub campaign_name: Option<String>,
    pub portfolio_id: Option<i64>,
    pub portfolio_name: Option<String>,
    pub campaign_budget: Option<f64>,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub units: i64,
}

/// Per-target (keyword or product target) sums.
#[derive(Debug, Clone, FromRow)]
pub struct TargetAgg {
    pub campaign_id: i64,
    pub campaign_name: Option<String>,
    pub ad_group_id: Option<i64>,
    pub ad_group_name: Option<String>,
    pub target_value: String,
    pub match_type: Option<String>,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub units: i64,
}

/// Per-search-term sums within one campaign.
#[derive(Debug, Clone, FromRow)]
pub struct SearchTermAgg {
    pub campaign_id: i64,
    pub campaign_name: Option<String>,
    pub ad_group_id: Option<i64>,
    pub ad_group_name: Option<String>,
    pub search_term: String,
    pub match_type: Option<String>,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub units: i64,
}

/// Per-placement sums within one campaign.
#[derive(Debug, Clone, FromRow)]
pub struct PlacementAgg {
    pub campaign_id: i64,
    pub placement: String,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub units: i64,
}
