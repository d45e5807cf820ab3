//! The suggestion evaluator.
//!
//! `evaluate` applies a rule set plus operator thresholds to pre-aggregated
//! metric summaries and returns categorized suggestions, each carrying the
//! bulk actions that implement it. The function is pure: for fixed inputs
//! it always produces the same suggestions in the same order.
//!
//! Per category, two modes exist. When the rule set has rules for the
//! category, they are evaluated in stored order and EVERY enabled rule
//! whose conditions all hold emits a suggestion -- no first-match
//! short-circuit, so contradictory matches all surface and the operator
//! chooses. When a category has no rules, the built-in default policy
//! applies, gated by [`Thresholds`].

pub mod input;
pub mod thresholds;

mod bids;
mod exact;
mod negatives;
mod pause;
mod placement;

use serde::{Deserialize, Serialize};

use crate::bulksheet::BulkAction;
use crate::hashing::sha256_hex;
use crate::rules::{Category, Rule, RuleSet};

pub use input::{
    AnalysisInput, CampaignSummary, PlacementSummary, SearchTermSummary, TargetEntity,
    TargetSummary,
};
pub use thresholds::Thresholds;

/// How urgent a suggestion is, for operator-side sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One actionable finding. Ephemeral: a response artifact, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    /// Snapshot of the measures the decision was based on.
    pub metrics: serde_json::Value,
    /// Bulk rows ready for materialization; may be empty for
    /// informational findings.
    pub actions: Vec<BulkAction>,
}

/// Run every category generator and return the merged suggestion list.
///
/// Categories are evaluated independently; one entity may yield
/// suggestions in several categories at once.
pub fn evaluate(input: &AnalysisInput, rule_set: &RuleSet, thresholds: &Thresholds) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    suggestions.extend(exact::generate(input, &rule_set.rules.exact, thresholds));
    suggestions.extend(negatives::generate(input, &rule_set.rules.negatives, thresholds));
    suggestions.extend(pause::generate(input, &rule_set.rules.pause, thresholds));
    suggestions.extend(placement::generate(input, &rule_set.rules.placement, thresholds));
    suggestions.extend(bids::generate(input, &rule_set.rules.bids, thresholds));

    // Stable ids: position plus a digest of the title, so re-evaluating
    // the same inputs reproduces the same ids.
    for (i, suggestion) in suggestions.iter_mut().enumerate() {
        let digest = sha256_hex(suggestion.title.as_bytes());
        suggestion.id = format!("sug_{i}_{}", &digest[..8]);
    }

    tracing::info!(
        rule_set = %rule_set.name,
        count = suggestions.len(),
        "Generated suggestions"
    );
    suggestions
}

/// All enabled rules matching a metric lookup, in stored order.
///
/// A rule referencing a metric the lookup does not know is skipped with a
/// warning; one bad rule must not abort evaluation of the rest.
pub(crate) fn matching_rules<'a, F>(rules: &'a [Rule], lookup: F) -> Vec<&'a Rule>
where
    F: Fn(&str) -> Option<f64>,
{
    rules
        .iter()
        .filter(|rule| match rule.matches(&lookup) {
            Some(matched) => matched,
            None => {
                tracing::warn!(
                    rule_id = %rule.id,
                    rule_name = %rule.name,
                    "Rule references an unknown metric, skipping"
                );
                false
            }
        })
        .collect()
}

/// Severity from the magnitude by which an observed value exceeds its
/// gate: at least 3x is high, at least 1.5x is medium, anything less is
/// low. Monotonic in the observed value.
pub(crate) fn severity_from_ratio(observed: f64, gate: f64) -> Severity {
    if gate <= 0.0 {
        return Severity::Medium;
    }
    let ratio = observed / gate;
    if ratio >= 3.0 {
        Severity::High
    } else if ratio >= 1.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity for a rule-driven match, derived from the rule's first
/// condition: how far the observed value is past the threshold.
pub(crate) fn rule_severity<F>(rule: &Rule, lookup: F) -> Severity
where
    F: Fn(&str) -> Option<f64>,
{
    match rule.conditions.first() {
        Some(cond) => {
            let observed = lookup(&cond.metric).unwrap_or(0.0);
            severity_from_ratio(observed.abs(), cond.value.abs())
        }
        None => Severity::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulksheet::{ENTITY_CAMPAIGN, ENTITY_CAMPAIGN_NEGATIVE_KEYWORD, OP_CREATE, OP_UPDATE};
    use crate::metrics::MetricSnapshot;
    use crate::rules::{Action, Comparator, Condition, NegativeMatchType, RuleSet};

    fn rule(id: &str, conditions: Vec<(&str, Comparator, f64)>, action: Action) -> Rule {
        Rule {
            id: id.into(),
            name: id.into(),
            enabled: true,
            conditions: conditions
                .into_iter()
                .map(|(metric, operator, value)| Condition {
                    metric: metric.into(),
                    operator,
                    value,
                })
                .collect(),
            action,
        }
    }

    fn empty_rule_set() -> RuleSet {
        RuleSet {
            name: "test".into(),
            version: 1,
            rules: Default::default(),
        }
    }

    fn wasted_term_input() -> AnalysisInput {
        AnalysisInput {
            search_terms: vec![SearchTermSummary {
                search_term: "cheap charger".into(),
                campaign_id: 100,
                campaign_name: "C1".into(),
                ad_group_id: Some(200),
                ad_group_name: "AG1".into(),
                source_type: "broad".into(),
                metrics: MetricSnapshot {
                    clicks: 15,
                    orders: 0,
                    spend: 8.0,
                    ..Default::default()
                },
            }],
            ..Default::default()
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let input = wasted_term_input();
        let rule_set = RuleSet::balanced();
        let thresholds = Thresholds::default();

        let first = evaluate(&input, &rule_set, &thresholds);
        let second = evaluate(&input, &rule_set, &thresholds);

        assert!(!first.is_empty());
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.actions, b.actions);
        }
    }

    #[test]
    fn custom_rule_end_to_end_negative() {
        // Rule [orders == 0, clicks >= 10] against {clicks: 15, orders: 0,
        // spend: 8} yields exactly one negatives suggestion whose single
        // action is a campaign negative keyword create.
        let mut rule_set = empty_rule_set();
        rule_set.rules.negatives = vec![rule(
            "neg-1",
            vec![
                ("orders", Comparator::Eq, 0.0),
                ("clicks", Comparator::Ge, 10.0),
            ],
            Action::AddNegative {
                match_type: NegativeMatchType::NegativeExact,
            },
        )];

        let suggestions = evaluate(&wasted_term_input(), &rule_set, &Thresholds::default());

        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(s.category, Category::Negatives);
        assert_eq!(s.actions.len(), 1);
        let action = &s.actions[0];
        assert_eq!(action.entity, ENTITY_CAMPAIGN_NEGATIVE_KEYWORD);
        assert_eq!(action.operation, OP_CREATE);
        assert_eq!(action.match_type, "Negative Exact");
        assert_eq!(action.keyword_text, "cheap charger");
        assert_eq!(action.campaign_id, "100");
    }

    #[test]
    fn and_semantics_require_all_conditions() {
        // spend > 5 holds but acos > 35 does not: no suggestion.
        let mut rule_set = empty_rule_set();
        rule_set.rules.pause = vec![rule(
            "pause-1",
            vec![
                ("spend", Comparator::Gt, 5.0),
                ("acos", Comparator::Gt, 35.0),
            ],
            Action::Pause,
        )];

        let input = AnalysisInput {
            campaigns: vec![CampaignSummary {
                campaign_id: 1,
                name: "C1".into(),
                metrics: MetricSnapshot {
                    spend: 6.0,
                    sales: 20.0, // acos = 30%
                    clicks: 10,
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };

        let suggestions = evaluate(&input, &rule_set, &Thresholds::default());
        assert!(suggestions.is_empty());
    }

    #[test]
    fn every_matching_rule_emits_a_suggestion() {
        // Two enabled negatives rules both match: both suggestions surface,
        // in stored rule order, so the operator can pick.
        let mut rule_set = empty_rule_set();
        rule_set.rules.negatives = vec![
            rule(
                "neg-exact",
                vec![("clicks", Comparator::Ge, 10.0)],
                Action::AddNegative {
                    match_type: NegativeMatchType::NegativeExact,
                },
            ),
            rule(
                "neg-phrase",
                vec![("spend", Comparator::Ge, 5.0)],
                Action::AddNegative {
                    match_type: NegativeMatchType::NegativePhrase,
                },
            ),
        ];

        let suggestions = evaluate(&wasted_term_input(), &rule_set, &Thresholds::default());
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].actions[0].match_type, "Negative Exact");
        assert_eq!(suggestions[1].actions[0].match_type, "Negative Phrase");
    }

    #[test]
    fn malformed_rule_is_skipped_not_fatal() {
        let mut rule_set = empty_rule_set();
        rule_set.rules.negatives = vec![
            rule(
                "bad",
                vec![("velocity", Comparator::Gt, 1.0)],
                Action::AddNegative {
                    match_type: NegativeMatchType::NegativeExact,
                },
            ),
            rule(
                "good",
                vec![("clicks", Comparator::Ge, 10.0)],
                Action::AddNegative {
                    match_type: NegativeMatchType::NegativeExact,
                },
            ),
        ];

        let suggestions = evaluate(&wasted_term_input(), &rule_set, &Thresholds::default());
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].actions[0].match_type, "Negative Exact");
    }

    #[test]
    fn categories_evaluate_independently() {
        // One input produces both a negatives suggestion (search term) and
        // a pause suggestion (campaign) in the same run.
        let mut input = wasted_term_input();
        input.campaigns = vec![CampaignSummary {
            campaign_id: 100,
            name: "C1".into(),
            metrics: MetricSnapshot {
                spend: 20.0,
                clicks: 30,
                orders: 0,
                ..Default::default()
            },
            ..Default::default()
        }];

        let suggestions = evaluate(&input, &RuleSet::balanced(), &Thresholds::default());
        let categories: Vec<Category> = suggestions.iter().map(|s| s.category).collect();
        assert!(categories.contains(&Category::Negatives));
        assert!(categories.contains(&Category::Pause));
    }

    #[test]
    fn pause_suggestion_updates_campaign_state() {
        let input = AnalysisInput {
            campaigns: vec![CampaignSummary {
                campaign_id: 7,
                name: "Wasteful".into(),
                metrics: MetricSnapshot {
                    spend: 50.0,
                    clicks: 40,
                    orders: 0,
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };

        let suggestions = evaluate(&input, &RuleSet::balanced(), &Thresholds::default());
        assert_eq!(suggestions.len(), 1);
        let action = &suggestions[0].actions[0];
        assert_eq!(action.entity, ENTITY_CAMPAIGN);
        assert_eq!(action.operation, OP_UPDATE);
        assert_eq!(action.state, "paused");
    }

    #[test]
    fn severity_scales_with_magnitude() {
        assert_eq!(severity_from_ratio(10.0, 10.0), Severity::Low);
        assert_eq!(severity_from_ratio(16.0, 10.0), Severity::Medium);
        assert_eq!(severity_from_ratio(30.0, 10.0), Severity::High);
        // Zero gate cannot express magnitude.
        assert_eq!(severity_from_ratio(5.0, 0.0), Severity::Medium);
    }
}
