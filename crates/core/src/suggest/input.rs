//! Pre-aggregated evaluator inputs.
//!
//! The evaluator never touches storage: the caller loads these summaries
//! (grouped sums over the metric row store for a date range) and passes
//! them in. Each summary carries the entity's identity plus a
//! [`MetricSnapshot`] of its summed measures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::metrics::MetricSnapshot;

/// Target entity kind as spelled in the bulk sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetEntity {
    Keyword,
    ProductTargeting,
}

impl TargetEntity {
    /// Bulk sheet spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetEntity::Keyword => "Keyword",
            TargetEntity::ProductTargeting => "Product Targeting",
        }
    }
}

/// One campaign's aggregate over the evaluation window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: i64,
    pub name: String,
    pub portfolio_id: Option<i64>,
    pub portfolio_name: Option<String>,
    pub daily_budget: f64,
    /// Advertised ASIN, when known from the source data.
    pub asin: Option<String>,
    /// Advertised SKU, when known from the source data.
    pub sku: Option<String>,
    pub metrics: MetricSnapshot,
}

/// One keyword or product target's aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSummary {
    pub entity: Option<TargetEntity>,
    pub campaign_id: i64,
    pub campaign_name: String,
    pub ad_group_id: Option<i64>,
    pub ad_group_name: String,
    /// Keyword text; empty for product targets.
    pub keyword_text: String,
    pub match_type: String,
    /// Targeting expression; empty for keywords.
    pub product_targeting_expression: String,
    /// Current bid. Callers loading from the row store approximate this
    /// with the observed average CPC.
    pub bid: f64,
    pub enabled: bool,
    pub metrics: MetricSnapshot,
}

impl TargetSummary {
    /// Resolve the entity kind, inferring it from which of the two
    /// identity fields is populated when not set explicitly.
    pub fn entity_kind(&self) -> TargetEntity {
        self.entity.unwrap_or({
            if self.product_targeting_expression.is_empty() {
                TargetEntity::Keyword
            } else {
                TargetEntity::ProductTargeting
            }
        })
    }

    /// Display label: the keyword text or targeting expression.
    pub fn label(&self) -> &str {
        if self.keyword_text.is_empty() {
            &self.product_targeting_expression
        } else {
            &self.keyword_text
        }
    }
}

/// One placement's aggregate for one campaign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementSummary {
    pub campaign_id: i64,
    pub placement: String,
    /// Current bidding adjustment percentage for the placement.
    pub percentage: f64,
    pub metrics: MetricSnapshot,
}

/// One search term's aggregate within one campaign.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchTermSummary {
    pub search_term: String,
    pub campaign_id: i64,
    pub campaign_name: String,
    pub ad_group_id: Option<i64>,
    pub ad_group_name: String,
    /// The match type or targeting expression that surfaced the term
    /// (e.g. "broad", "close-match"). Exact-sourced terms are not
    /// candidates for harvesting or negation.
    pub source_type: String,
    pub metrics: MetricSnapshot,
}

/// Everything the evaluator needs for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Date stamped onto Create Campaign rows.
    pub evaluation_date: Option<NaiveDate>,
    pub campaigns: Vec<CampaignSummary>,
    pub targets: Vec<TargetSummary>,
    pub placements: Vec<PlacementSummary>,
    pub search_terms: Vec<SearchTermSummary>,
    /// Keyword texts that already exist as exact keywords (any casing).
    pub existing_exact_keywords: Vec<String>,
    /// Existing negative keys in `{campaign_id}|{normalized term}` form.
    pub existing_negatives: Vec<String>,
}

/// Normalize a keyword for comparison: lowercase, collapse whitespace.
pub fn normalize_term(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Dedup key for a campaign-level negative keyword.
pub fn negative_key(campaign_id: i64, term: &str) -> String {
    format!("{campaign_id}|{}", normalize_term(term))
}

/// Whether a search term came from a non-exact source (broad, phrase,
/// auto, category). Only those are candidates for harvesting/negation.
pub fn is_non_exact_source(source_type: &str) -> bool {
    let s = source_type.trim().to_lowercase();
    !matches!(s.as_str(), "exact" | "exact match")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_normalization() {
        assert_eq!(normalize_term("  Wireless   Charger "), "wireless charger");
        assert_eq!(negative_key(42, "Wireless  Charger"), "42|wireless charger");
    }

    #[test]
    fn exact_sources_are_excluded() {
        assert!(!is_non_exact_source("exact"));
        assert!(!is_non_exact_source("Exact Match"));
        assert!(is_non_exact_source("broad"));
        assert!(is_non_exact_source("close-match"));
        assert!(is_non_exact_source(""));
    }

    #[test]
    fn target_entity_inference() {
        let keyword = TargetSummary {
            keyword_text: "charger".into(),
            ..Default::default()
        };
        assert_eq!(keyword.entity_kind(), TargetEntity::Keyword);
        assert_eq!(keyword.label(), "charger");

        let product = TargetSummary {
            product_targeting_expression: "asin=\"B0ABCDEFGH\"".into(),
            ..Default::default()
        };
        assert_eq!(product.entity_kind(), TargetEntity::ProductTargeting);
        assert_eq!(product.label(), "asin=\"B0ABCDEFGH\"");
    }
}
