//! Operator-tunable thresholds gating the built-in suggestion policies.
//!
//! These are separate from rule conditions: when a rule set category has
//! no rules, the built-in policy for that category applies and these
//! values gate which rows are even considered candidates. Ratio-valued
//! fields (ACOS, CVR, bid step) are fractions, e.g. `0.35` for 35%.

use serde::{Deserialize, Serialize};

use crate::rules::NegativeMatchType;

/// Built-in policy thresholds with their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// ACOS above which a placement is considered ineffective.
    pub acos_ineffective: f64,
    /// Target ACOS for optimization.
    pub acos_target: f64,
    /// Minimum spend before a campaign is a pause candidate.
    pub spend_campaign_pause: f64,
    /// Minimum spend before a target is a pause candidate.
    pub spend_target_pause: f64,
    /// Minimum clicks before a search term is a negative candidate.
    pub clicks_negative: i64,
    /// Minimum spend before a search term is a negative candidate.
    pub spend_negative: f64,
    /// Match type used for built-in negative suggestions.
    pub negative_match_type: NegativeMatchType,
    /// Minimum orders before a search term is promoted to its own campaign.
    pub orders_create_exact: i64,
    /// Minimum CVR before a search term is promoted to its own campaign.
    pub cvr_create_exact: f64,
    /// Multiplier on source CPC for new exact campaign bids.
    pub bid_multiplier: f64,
    /// Minimum CVR for a bid increase.
    pub cvr_bid_increase: f64,
    /// Maximum ACOS for a bid increase.
    pub acos_bid_increase: f64,
    /// ACOS ceiling used when computing the maximum boosted CPC.
    pub acos_target_increase: f64,
    /// Bid increase step.
    pub bid_increase_step: f64,
    /// Minimum orders for a bid increase.
    pub orders_bid_increase: i64,
    /// Minimum clicks for a bid increase.
    pub clicks_bid_increase: i64,
    /// Platform maximum placement percentage.
    pub max_placement_pct: f64,
    /// Base bid reduction ratio used by placement optimization.
    pub bid_reduction_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            acos_ineffective: 0.35,
            acos_target: 0.30,
            spend_campaign_pause: 15.0,
            spend_target_pause: 10.0,
            clicks_negative: 10,
            spend_negative: 5.0,
            negative_match_type: NegativeMatchType::NegativeExact,
            orders_create_exact: 2,
            cvr_create_exact: 0.20,
            bid_multiplier: 1.1,
            cvr_bid_increase: 0.30,
            acos_bid_increase: 0.20,
            acos_target_increase: 0.25,
            bid_increase_step: 0.15,
            orders_bid_increase: 3,
            clicks_bid_increase: 10,
            max_placement_pct: 900.0,
            bid_reduction_ratio: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_defaults() {
        let t: Thresholds =
            serde_json::from_str(r#"{"clicks_negative": 5, "spend_negative": 2.5}"#).unwrap();
        assert_eq!(t.clicks_negative, 5);
        assert_eq!(t.spend_negative, 2.5);
        assert_eq!(t.acos_ineffective, 0.35);
        assert_eq!(t.negative_match_type, NegativeMatchType::NegativeExact);
    }
}
