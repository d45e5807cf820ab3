//! Search term negatives: stop paying for terms that click but never convert.

use std::collections::HashSet;

use serde_json::json;

use crate::bulksheet::{BulkAction, ENTITY_CAMPAIGN_NEGATIVE_KEYWORD, OP_CREATE, STATE_ENABLED};
use crate::metrics::round2;
use crate::rules::{Action, Category, NegativeMatchType, Rule};

use super::input::{is_non_exact_source, negative_key, normalize_term, AnalysisInput, SearchTermSummary};
use super::{matching_rules, rule_severity, Severity, Suggestion, Thresholds};

pub(super) fn generate(input: &AnalysisInput, rules: &[Rule], t: &Thresholds) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let mut seen: HashSet<String> = input.existing_negatives.iter().cloned().collect();

    for term in &input.search_terms {
        if !is_non_exact_source(&term.source_type) {
            continue;
        }
        if normalize_term(&term.search_term).is_empty() {
            continue;
        }
        let key = negative_key(term.campaign_id, &term.search_term);
        if seen.contains(&key) {
            continue;
        }

        let snap = &term.metrics;
        let mut emissions: Vec<(NegativeMatchType, Severity)> = Vec::new();

        if !rules.is_empty() {
            for rule in matching_rules(rules, |k| snap.get(k)) {
                if let Action::AddNegative { match_type } = rule.action {
                    emissions.push((match_type, rule_severity(rule, |k| snap.get(k))));
                }
            }
        } else if snap.clicks >= t.clicks_negative
            && snap.orders == 0
            && snap.spend >= t.spend_negative
        {
            emissions.push((t.negative_match_type, Severity::High));
        }

        if emissions.is_empty() {
            continue;
        }
        seen.insert(key);

        for (match_type, severity) in emissions {
            out.push(suggestion(term, match_type, severity));
        }
    }
    out
}

fn suggestion(
    term: &SearchTermSummary,
    match_type: NegativeMatchType,
    severity: Severity,
) -> Suggestion {
    let snap = &term.metrics;
    let display: String = term.search_term.chars().take(60).collect();

    Suggestion {
        id: String::new(),
        category: Category::Negatives,
        severity,
        title: format!(
            "Negative '{display}' in '{}' - {} clicks, ${:.2}, 0 orders",
            term.campaign_name, snap.clicks, snap.spend
        ),
        detail: format!(
            "Wasting spend via {}. Add as campaign-level {}.",
            term.source_type,
            match_type.as_str().to_lowercase()
        ),
        metrics: json!({
            "search_term": term.search_term,
            "clicks": snap.clicks,
            "spend": round2(snap.spend),
            "source": term.source_type,
            "cpc": round2(snap.cpc()),
        }),
        actions: vec![BulkAction {
            entity: ENTITY_CAMPAIGN_NEGATIVE_KEYWORD.into(),
            operation: OP_CREATE.into(),
            campaign_id: term.campaign_id.to_string(),
            campaign_name: term.campaign_name.clone(),
            keyword_text: term.search_term.clone(),
            match_type: match_type.as_str().into(),
            state: STATE_ENABLED.into(),
            ..BulkAction::sponsored_products()
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricSnapshot;

    fn term(search_term: &str, clicks: i64, orders: i64, spend: f64) -> SearchTermSummary {
        SearchTermSummary {
            search_term: search_term.into(),
            campaign_id: 100,
            campaign_name: "C1".into(),
            ad_group_id: Some(200),
            ad_group_name: "AG1".into(),
            source_type: "broad".into(),
            metrics: MetricSnapshot {
                clicks,
                orders,
                spend,
                ..Default::default()
            },
        }
    }

    fn input(terms: Vec<SearchTermSummary>) -> AnalysisInput {
        AnalysisInput {
            search_terms: terms,
            ..Default::default()
        }
    }

    #[test]
    fn negates_wasting_term() {
        let out = generate(
            &input(vec![term("junk term", 12, 0, 9.0)]),
            &[],
            &Thresholds::default(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::High);
        assert_eq!(out[0].actions[0].entity, ENTITY_CAMPAIGN_NEGATIVE_KEYWORD);
        assert_eq!(out[0].actions[0].match_type, "Negative Exact");
    }

    #[test]
    fn skips_exact_source_and_converting_terms() {
        let mut exact_term = term("exact junk", 20, 0, 9.0);
        exact_term.source_type = "exact".into();
        let converting = term("good term", 20, 2, 9.0);
        let thin = term("thin term", 3, 0, 9.0);
        let out = generate(
            &input(vec![exact_term, converting, thin]),
            &[],
            &Thresholds::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn skips_existing_negative() {
        let mut analysis = input(vec![term("junk term", 12, 0, 9.0)]);
        analysis.existing_negatives = vec![negative_key(100, "Junk  Term")];
        let out = generate(&analysis, &[], &Thresholds::default());
        assert!(out.is_empty());
    }

    #[test]
    fn same_term_not_emitted_twice_across_ad_groups() {
        let mut second = term("junk term", 15, 0, 12.0);
        second.ad_group_id = Some(201);
        let out = generate(
            &input(vec![term("junk term", 12, 0, 9.0), second]),
            &[],
            &Thresholds::default(),
        );
        assert_eq!(out.len(), 1);
    }
}
