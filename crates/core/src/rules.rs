//! Rule sets: named, versioned bundles of per-category optimization rules.
//!
//! A rule set maps each of the five fixed categories to an ordered list of
//! rules. Rules are plain condition lists (AND only) with one action whose
//! payload is category-specific. The document form used for import/export
//! is exactly `{placement, exact, bids, negatives, pause}` with array
//! values; anything else is rejected so a malformed import can never
//! corrupt the registry.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The five fixed suggestion/action categories, in evaluation order.
pub const CATEGORIES: [Category; 5] = [
    Category::Exact,
    Category::Negatives,
    Category::Pause,
    Category::Placement,
    Category::Bids,
];

/// Suggestion/action family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Placement,
    Exact,
    Bids,
    Negatives,
    Pause,
}

impl Category {
    /// Stable lowercase name, matching the document keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Placement => "placement",
            Category::Exact => "exact",
            Category::Bids => "bids",
            Category::Negatives => "negatives",
            Category::Pause => "pause",
        }
    }
}

/// Comparison operator for a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Comparator {
    /// Apply the comparison with the observed value on the left.
    pub fn compare(self, actual: f64, value: f64) -> bool {
        match self {
            Comparator::Gt => actual > value,
            Comparator::Ge => actual >= value,
            Comparator::Lt => actual < value,
            Comparator::Le => actual <= value,
            Comparator::Eq => actual == value,
            Comparator::Ne => actual != value,
        }
    }
}

/// A single metric comparison. Percentage metrics (acos, cvr, ctr) are
/// expressed as whole numbers, e.g. `35` for 35%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub metric: String,
    pub operator: Comparator,
    pub value: f64,
}

/// Negative keyword match type accepted by the bulk sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegativeMatchType {
    #[serde(rename = "Negative Exact")]
    NegativeExact,
    #[serde(rename = "Negative Phrase")]
    NegativePhrase,
}

impl NegativeMatchType {
    /// Bulk sheet spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            NegativeMatchType::NegativeExact => "Negative Exact",
            NegativeMatchType::NegativePhrase => "Negative Phrase",
        }
    }
}

// ---------------------------------------------------------------------------
// Actions and their valid numeric ranges
// ---------------------------------------------------------------------------

/// Valid placement percentage range.
pub const PLACEMENT_PERCENTAGE_RANGE: (f64, f64) = (0.0, 900.0);
/// Valid bid reduction ratio range.
pub const BID_REDUCTION_RATIO_RANGE: (f64, f64) = (0.1, 1.0);
/// Valid bid multiplier range for new exact campaigns.
pub const BID_MULTIPLIER_RANGE: (f64, f64) = (0.5, 3.0);
/// Valid bid increase step range, in percent.
pub const BID_STEP_RANGE: (f64, f64) = (1.0, 100.0);

/// Clamp `v` into the inclusive `range`.
pub fn clamp(v: f64, range: (f64, f64)) -> f64 {
    v.max(range.0).min(range.1)
}

/// What a matching rule does, tagged by category-specific type.
///
/// Numeric payloads are clamped to the category's valid range at
/// instantiation time rather than rejected, because they may come from
/// stale operator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Placement: set the placement percentage to a fixed value.
    SetPercentage { value: f64 },
    /// Placement: scale base bids down by a ratio.
    ReduceBid { ratio: f64 },
    /// Exact: spin a search term out into its own exact campaign.
    CreateCampaign { bid_multiplier: f64 },
    /// Bids: raise bids by a percentage step.
    IncreaseBid { step: f64 },
    /// Negatives: add a campaign-level negative keyword.
    AddNegative { match_type: NegativeMatchType },
    /// Pause: pause the matched campaign or target.
    Pause,
}

impl Action {
    /// The `type` tag as it appears in the document form.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SetPercentage { .. } => "set_percentage",
            Action::ReduceBid { .. } => "reduce_bid",
            Action::CreateCampaign { .. } => "create_campaign",
            Action::IncreaseBid { .. } => "increase_bid",
            Action::AddNegative { .. } => "add_negative",
            Action::Pause => "pause",
        }
    }

    /// Whether this action type is legal for `category`.
    pub fn allowed_in(&self, category: Category) -> bool {
        matches!(
            (category, self),
            (Category::Placement, Action::SetPercentage { .. })
                | (Category::Placement, Action::ReduceBid { .. })
                | (Category::Exact, Action::CreateCampaign { .. })
                | (Category::Bids, Action::IncreaseBid { .. })
                | (Category::Negatives, Action::AddNegative { .. })
                | (Category::Pause, Action::Pause)
        )
    }

    /// Copy of the action with numeric payloads clamped to their range.
    pub fn clamped(&self) -> Action {
        match *self {
            Action::SetPercentage { value } => Action::SetPercentage {
                value: clamp(value, PLACEMENT_PERCENTAGE_RANGE),
            },
            Action::ReduceBid { ratio } => Action::ReduceBid {
                ratio: clamp(ratio, BID_REDUCTION_RATIO_RANGE),
            },
            Action::CreateCampaign { bid_multiplier } => Action::CreateCampaign {
                bid_multiplier: clamp(bid_multiplier, BID_MULTIPLIER_RANGE),
            },
            Action::IncreaseBid { step } => Action::IncreaseBid {
                step: clamp(step, BID_STEP_RANGE),
            },
            ref other => other.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rules and rule sets
// ---------------------------------------------------------------------------

fn default_enabled() -> bool {
    true
}

/// One operator-authored rule: an AND-combined condition list plus an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub conditions: Vec<Condition>,
    pub action: Action,
}

impl Rule {
    /// Test the rule against a metric lookup.
    ///
    /// Returns `None` when a condition references a metric key the lookup
    /// does not know — the caller logs and skips such malformed rules.
    /// A disabled rule or a rule with no conditions never matches.
    pub fn matches<F>(&self, lookup: F) -> Option<bool>
    where
        F: Fn(&str) -> Option<f64>,
    {
        if !self.enabled || self.conditions.is_empty() {
            return Some(false);
        }
        for cond in &self.conditions {
            let actual = lookup(&cond.metric)?;
            if !cond.operator.compare(actual, cond.value) {
                return Some(false);
            }
        }
        Some(true)
    }
}

/// The per-category rule lists: the document form of a rule set.
///
/// Exactly the five fixed keys, each an array. `deny_unknown_fields`
/// backs up the explicit [`CategoryRules::from_document`] validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRules {
    pub placement: Vec<Rule>,
    pub exact: Vec<Rule>,
    pub bids: Vec<Rule>,
    pub negatives: Vec<Rule>,
    pub pause: Vec<Rule>,
}

impl CategoryRules {
    /// The ordered rule list for one category.
    pub fn for_category(&self, category: Category) -> &[Rule] {
        match category {
            Category::Placement => &self.placement,
            Category::Exact => &self.exact,
            Category::Bids => &self.bids,
            Category::Negatives => &self.negatives,
            Category::Pause => &self.pause,
        }
    }

    /// Total number of rules across all categories.
    pub fn rule_count(&self) -> usize {
        CATEGORIES
            .iter()
            .map(|c| self.for_category(*c).len())
            .sum()
    }

    /// Parse and validate an imported document.
    ///
    /// All five category keys must be present and array-typed, no other
    /// keys are allowed, and every rule's action type must be legal for
    /// its category. Violations return `CoreError::Validation` and leave
    /// nothing partially applied.
    pub fn from_document(doc: &serde_json::Value) -> Result<Self, CoreError> {
        let obj = doc.as_object().ok_or_else(|| {
            CoreError::Validation("Rule set document must be a JSON object".into())
        })?;

        for category in CATEGORIES {
            match obj.get(category.as_str()) {
                Some(v) if v.is_array() => {}
                Some(_) => {
                    return Err(CoreError::Validation(format!(
                        "Rule set category '{}' must be an array",
                        category.as_str()
                    )))
                }
                None => {
                    return Err(CoreError::Validation(format!(
                        "Rule set document is missing category '{}'",
                        category.as_str()
                    )))
                }
            }
        }
        for key in obj.keys() {
            if !CATEGORIES.iter().any(|c| c.as_str() == key) {
                return Err(CoreError::Validation(format!(
                    "Unknown rule set category '{key}'"
                )));
            }
        }

        let rules: CategoryRules = serde_json::from_value(doc.clone())
            .map_err(|e| CoreError::Validation(format!("Malformed rule set document: {e}")))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check that every rule's action type belongs to its category.
    pub fn validate(&self) -> Result<(), CoreError> {
        for category in CATEGORIES {
            for rule in self.for_category(category) {
                if !rule.action.allowed_in(category) {
                    return Err(CoreError::Validation(format!(
                        "Rule '{}': action type '{}' is not valid for category '{}'",
                        rule.id,
                        rule.action.type_name(),
                        category.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A named, versioned rule bundle as held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub version: i32,
    pub rules: CategoryRules,
}

/// Name of the rule set seeded at first initialization.
pub const DEFAULT_RULE_SET_NAME: &str = "Balanced";

impl RuleSet {
    /// The seeded "Balanced" rule set.
    ///
    /// Its rules mirror the built-in default policies, so evaluating with
    /// it produces the same families of suggestions as an empty rule set
    /// while giving operators a concrete starting point to edit.
    pub fn balanced() -> RuleSet {
        RuleSet {
            name: DEFAULT_RULE_SET_NAME.to_string(),
            version: 1,
            rules: CategoryRules {
                placement: vec![Rule {
                    id: "balanced-placement-1".into(),
                    name: "Zero out high-ACOS placements".into(),
                    enabled: true,
                    conditions: vec![
                        cond("acos", Comparator::Gt, 35.0),
                        cond("spend", Comparator::Gt, 0.0),
                    ],
                    action: Action::SetPercentage { value: 0.0 },
                }],
                exact: vec![Rule {
                    id: "balanced-exact-1".into(),
                    name: "Promote converting search terms".into(),
                    enabled: true,
                    conditions: vec![
                        cond("orders", Comparator::Gt, 2.0),
                        cond("cvr", Comparator::Ge, 20.0),
                    ],
                    action: Action::CreateCampaign {
                        bid_multiplier: 1.1,
                    },
                }],
                bids: vec![Rule {
                    id: "balanced-bids-1".into(),
                    name: "Boost strong campaigns".into(),
                    enabled: true,
                    conditions: vec![
                        cond("clicks", Comparator::Ge, 10.0),
                        cond("orders", Comparator::Ge, 3.0),
                        cond("cvr", Comparator::Ge, 30.0),
                        cond("acos", Comparator::Le, 20.0),
                    ],
                    action: Action::IncreaseBid { step: 15.0 },
                }],
                negatives: vec![Rule {
                    id: "balanced-negatives-1".into(),
                    name: "Negate wasted search terms".into(),
                    enabled: true,
                    conditions: vec![
                        cond("clicks", Comparator::Ge, 10.0),
                        cond("orders", Comparator::Eq, 0.0),
                        cond("spend", Comparator::Ge, 5.0),
                    ],
                    action: Action::AddNegative {
                        match_type: NegativeMatchType::NegativeExact,
                    },
                }],
                pause: vec![Rule {
                    id: "balanced-pause-1".into(),
                    name: "Pause spenders with no orders".into(),
                    enabled: true,
                    conditions: vec![
                        cond("spend", Comparator::Ge, 15.0),
                        cond("orders", Comparator::Eq, 0.0),
                    ],
                    action: Action::Pause,
                }],
            },
        }
    }
}

fn cond(metric: &str, operator: Comparator, value: f64) -> Condition {
    Condition {
        metric: metric.into(),
        operator,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn lookup<'a>(pairs: &'a [(&'a str, f64)]) -> impl Fn(&str) -> Option<f64> + 'a {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    #[test]
    fn comparators() {
        assert!(Comparator::Gt.compare(2.0, 1.0));
        assert!(!Comparator::Gt.compare(1.0, 1.0));
        assert!(Comparator::Ge.compare(1.0, 1.0));
        assert!(Comparator::Lt.compare(0.5, 1.0));
        assert!(Comparator::Le.compare(1.0, 1.0));
        assert!(Comparator::Eq.compare(0.0, 0.0));
        assert!(Comparator::Ne.compare(1.0, 0.0));
    }

    #[test]
    fn conditions_combine_with_and() {
        let rule = Rule {
            id: "r1".into(),
            name: "test".into(),
            enabled: true,
            conditions: vec![
                cond("spend", Comparator::Gt, 5.0),
                cond("acos", Comparator::Gt, 35.0),
            ],
            action: Action::Pause,
        };
        // spend matches, acos does not: no match.
        assert_eq!(
            rule.matches(lookup(&[("spend", 6.0), ("acos", 30.0)])),
            Some(false)
        );
        assert_eq!(
            rule.matches(lookup(&[("spend", 6.0), ("acos", 40.0)])),
            Some(true)
        );
    }

    #[test]
    fn disabled_or_empty_rules_never_match() {
        let mut rule = Rule {
            id: "r1".into(),
            name: "test".into(),
            enabled: false,
            conditions: vec![cond("spend", Comparator::Ge, 0.0)],
            action: Action::Pause,
        };
        assert_eq!(rule.matches(lookup(&[("spend", 1.0)])), Some(false));

        rule.enabled = true;
        rule.conditions.clear();
        assert_eq!(rule.matches(lookup(&[("spend", 1.0)])), Some(false));
    }

    #[test]
    fn unknown_metric_key_is_reported() {
        let rule = Rule {
            id: "r1".into(),
            name: "test".into(),
            enabled: true,
            conditions: vec![cond("velocity", Comparator::Gt, 1.0)],
            action: Action::Pause,
        };
        assert_eq!(rule.matches(lookup(&[("spend", 1.0)])), None);
    }

    #[test]
    fn action_clamping() {
        assert_eq!(
            Action::IncreaseBid { step: 500.0 }.clamped(),
            Action::IncreaseBid { step: 100.0 }
        );
        assert_eq!(
            Action::SetPercentage { value: 1200.0 }.clamped(),
            Action::SetPercentage { value: 900.0 }
        );
        assert_eq!(
            Action::CreateCampaign {
                bid_multiplier: 0.1
            }
            .clamped(),
            Action::CreateCampaign {
                bid_multiplier: 0.5
            }
        );
        assert_eq!(Action::Pause.clamped(), Action::Pause);
    }

    #[test]
    fn action_serde_tagged_form() {
        let action: Action =
            serde_json::from_value(json!({"type": "increase_bid", "step": 15})).unwrap();
        assert_eq!(action, Action::IncreaseBid { step: 15.0 });

        let doc = serde_json::to_value(&Action::AddNegative {
            match_type: NegativeMatchType::NegativeExact,
        })
        .unwrap();
        assert_eq!(
            doc,
            json!({"type": "add_negative", "match_type": "Negative Exact"})
        );
    }

    #[test]
    fn document_missing_category_is_rejected() {
        let doc = json!({
            "placement": [], "exact": [], "bids": [], "negatives": [],
        });
        let err = CategoryRules::from_document(&doc).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("pause"));
    }

    #[test]
    fn document_with_unknown_category_is_rejected() {
        let doc = json!({
            "placement": [], "exact": [], "bids": [], "negatives": [], "pause": [],
            "budgets": [],
        });
        let err = CategoryRules::from_document(&doc).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("budgets"));
    }

    #[test]
    fn document_with_non_array_category_is_rejected() {
        let doc = json!({
            "placement": [], "exact": [], "bids": [], "negatives": [], "pause": {},
        });
        let err = CategoryRules::from_document(&doc).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("array"));
    }

    #[test]
    fn action_type_must_match_category() {
        let doc = json!({
            "placement": [], "exact": [], "bids": [], "negatives": [],
            "pause": [{
                "id": "p1", "name": "bad", "enabled": true,
                "conditions": [{"metric": "spend", "operator": ">", "value": 1}],
                "action": {"type": "increase_bid", "step": 10},
            }],
        });
        let err = CategoryRules::from_document(&doc).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("increase_bid"));
    }

    #[test]
    fn valid_document_round_trips() {
        let balanced = RuleSet::balanced();
        let doc = serde_json::to_value(&balanced.rules).unwrap();
        let parsed = CategoryRules::from_document(&doc).unwrap();
        assert_eq!(parsed, balanced.rules);
        assert_eq!(parsed.rule_count(), 5);
    }

    #[test]
    fn balanced_is_valid() {
        assert!(RuleSet::balanced().rules.validate().is_ok());
    }
}
