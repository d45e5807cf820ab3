//! Bulk sheet rows and CSV rendering.
//!
//! A [`BulkAction`] is one row of the advertising platform's bulk upload
//! sheet. Every column is always emitted (empty string when unused) so the
//! sheet stays rectangular across entity types. Field values are rendered
//! to their sheet spelling at construction time; this module only lays
//! them out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CoreError;

/// Canonical column order of the bulk sheet.
pub const BULK_COLUMNS: [&str; 21] = [
    "Product",
    "Entity",
    "Operation",
    "Campaign ID",
    "Campaign Name",
    "Ad Group ID",
    "Ad Group Name",
    "Portfolio ID",
    "Keyword Text",
    "Product Targeting Expression",
    "Match Type",
    "State",
    "Daily Budget",
    "Ad Group Default Bid",
    "Bid",
    "SKU",
    "Bidding Strategy",
    "Targeting Type",
    "Start Date",
    "Placement",
    "Percentage",
];

/// Sheet product line for all rows this system emits.
pub const PRODUCT_SPONSORED: &str = "Sponsored Products";

pub const ENTITY_CAMPAIGN: &str = "Campaign";
pub const ENTITY_AD_GROUP: &str = "Ad Group";
pub const ENTITY_PRODUCT_AD: &str = "Product Ad";
pub const ENTITY_KEYWORD: &str = "Keyword";
pub const ENTITY_PRODUCT_TARGETING: &str = "Product Targeting";
pub const ENTITY_CAMPAIGN_NEGATIVE_KEYWORD: &str = "Campaign Negative Keyword";
pub const ENTITY_BIDDING_ADJUSTMENT: &str = "Bidding Adjustment";

pub const OP_CREATE: &str = "Create";
pub const OP_UPDATE: &str = "Update";

pub const STATE_ENABLED: &str = "enabled";
pub const STATE_PAUSED: &str = "paused";

/// One bulk sheet row. JSON field names match the sheet columns so the
/// document form submitted back by the operator is the sheet row itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkAction {
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Operation")]
    pub operation: String,
    #[serde(rename = "Campaign ID")]
    pub campaign_id: String,
    #[serde(rename = "Campaign Name")]
    pub campaign_name: String,
    #[serde(rename = "Ad Group ID")]
    pub ad_group_id: String,
    #[serde(rename = "Ad Group Name")]
    pub ad_group_name: String,
    #[serde(rename = "Portfolio ID")]
    pub portfolio_id: String,
    #[serde(rename = "Keyword Text")]
    pub keyword_text: String,
    #[serde(rename = "Product Targeting Expression")]
    pub product_targeting_expression: String,
    #[serde(rename = "Match Type")]
    pub match_type: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Daily Budget")]
    pub daily_budget: String,
    #[serde(rename = "Ad Group Default Bid")]
    pub ad_group_default_bid: String,
    #[serde(rename = "Bid")]
    pub bid: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Bidding Strategy")]
    pub bidding_strategy: String,
    #[serde(rename = "Targeting Type")]
    pub targeting_type: String,
    #[serde(rename = "Start Date")]
    pub start_date: String,
    #[serde(rename = "Placement")]
    pub placement: String,
    #[serde(rename = "Percentage")]
    pub percentage: String,
}

impl BulkAction {
    /// A blank Sponsored Products row.
    pub fn sponsored_products() -> Self {
        BulkAction {
            product: PRODUCT_SPONSORED.to_string(),
            ..Default::default()
        }
    }

    /// Field values in [`BULK_COLUMNS`] order.
    fn fields(&self) -> [&str; 21] {
        [
            &self.product,
            &self.entity,
            &self.operation,
            &self.campaign_id,
            &self.campaign_name,
            &self.ad_group_id,
            &self.ad_group_name,
            &self.portfolio_id,
            &self.keyword_text,
            &self.product_targeting_expression,
            &self.match_type,
            &self.state,
            &self.daily_budget,
            &self.ad_group_default_bid,
            &self.bid,
            &self.sku,
            &self.bidding_strategy,
            &self.targeting_type,
            &self.start_date,
            &self.placement,
            &self.percentage,
        ]
    }
}

/// Render a currency value in sheet form (two decimals).
pub fn money(v: f64) -> String {
    format!("{v:.2}")
}

/// Render a placement percentage in sheet form (whole number).
pub fn percent(v: f64) -> String {
    format!("{}", v.round() as i64)
}

/// Render actions as the bulk sheet CSV: a header row followed by one
/// row per action, columns in [`BULK_COLUMNS`] order.
pub fn render(actions: &[BulkAction]) -> Result<Vec<u8>, CoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(BULK_COLUMNS)
        .map_err(|e| CoreError::Internal(format!("Failed to write bulk sheet header: {e}")))?;
    for action in actions {
        writer
            .write_record(action.fields())
            .map_err(|e| CoreError::Internal(format!("Failed to write bulk sheet row: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| CoreError::Internal(format!("Failed to flush bulk sheet: {e}")))
}

/// Per-entity and per-operation counts for a job summary.
pub fn action_summary(actions: &[BulkAction]) -> serde_json::Value {
    let mut by_entity: BTreeMap<&str, u64> = BTreeMap::new();
    let mut by_operation: BTreeMap<&str, u64> = BTreeMap::new();
    for action in actions {
        *by_entity.entry(action.entity.as_str()).or_default() += 1;
        *by_operation.entry(action.operation.as_str()).or_default() += 1;
    }
    json!({
        "total_actions": actions.len(),
        "by_entity": by_entity,
        "by_operation": by_operation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pause_row() -> BulkAction {
        BulkAction {
            entity: ENTITY_CAMPAIGN.into(),
            operation: OP_UPDATE.into(),
            campaign_id: "1001".into(),
            campaign_name: "Campaign One".into(),
            state: STATE_PAUSED.into(),
            ..BulkAction::sponsored_products()
        }
    }

    fn negative_row() -> BulkAction {
        BulkAction {
            entity: ENTITY_CAMPAIGN_NEGATIVE_KEYWORD.into(),
            operation: OP_CREATE.into(),
            campaign_id: "1001".into(),
            campaign_name: "Campaign One".into(),
            keyword_text: "wireless charger".into(),
            match_type: "Negative Exact".into(),
            state: STATE_ENABLED.into(),
            ..BulkAction::sponsored_products()
        }
    }

    #[test]
    fn rendered_sheet_is_rectangular() {
        let bytes = render(&[pause_row(), negative_row()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        // Every row has the same number of fields as the header, with
        // unused columns present as empty strings.
        let header_commas = lines[0].matches(',').count();
        for line in &lines[1..] {
            assert_eq!(line.matches(',').count(), header_commas);
        }
        assert!(lines[0].starts_with("Product,Entity,Operation,"));
        assert!(lines[2].contains("Negative Exact"));
    }

    #[test]
    fn summary_counts_by_entity_and_operation() {
        let summary = action_summary(&[pause_row(), negative_row(), negative_row()]);
        assert_eq!(summary["total_actions"], 3);
        assert_eq!(summary["by_entity"]["Campaign Negative Keyword"], 2);
        assert_eq!(summary["by_entity"]["Campaign"], 1);
        assert_eq!(summary["by_operation"]["Create"], 2);
        assert_eq!(summary["by_operation"]["Update"], 1);
    }

    #[test]
    fn json_field_names_match_sheet_columns() {
        let value = serde_json::to_value(negative_row()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), BULK_COLUMNS.len());
        for col in BULK_COLUMNS {
            assert!(obj.contains_key(col), "missing column {col}");
        }
        assert_eq!(value["Keyword Text"], "wireless charger");
        // Unused columns are empty strings, never omitted.
        assert_eq!(value["Placement"], "");
    }

    #[test]
    fn sheet_form_round_trips_through_json() {
        let row = negative_row();
        let value = serde_json::to_value(&row).unwrap();
        let parsed: BulkAction = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn value_formatting() {
        assert_eq!(money(1.5), "1.50");
        assert_eq!(money(0.025), "0.03");
        assert_eq!(percent(62.4), "62");
    }
}
