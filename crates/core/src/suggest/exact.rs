//! Exact campaign harvesting: spin converting search terms out of broad,
//! phrase, and auto campaigns into dedicated exact campaigns, and negate
//! the term in its source campaign so the two never compete.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::bulksheet::{
    money, BulkAction, ENTITY_AD_GROUP, ENTITY_CAMPAIGN, ENTITY_CAMPAIGN_NEGATIVE_KEYWORD,
    ENTITY_KEYWORD, ENTITY_PRODUCT_AD, OP_CREATE, STATE_ENABLED,
};
use crate::metrics::round2;
use crate::rules::{clamp, Action, Category, Rule, BID_MULTIPLIER_RANGE};

use super::input::{is_non_exact_source, normalize_term, AnalysisInput, CampaignSummary, SearchTermSummary};
use super::{matching_rules, rule_severity, Severity, Suggestion, Thresholds};

/// Bidding strategy stamped onto harvested campaigns.
const HARVEST_BIDDING_STRATEGY: &str = "Dynamic bids - down only";

/// Fallback CPC when the source term has spend but no clicks.
const FALLBACK_CPC: f64 = 0.50;

/// Minimum daily budget for a harvested campaign.
const MIN_HARVEST_BUDGET: f64 = 5.0;

fn asin_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(B0[A-Z0-9]{8})\b").expect("valid ASIN pattern"))
}

/// Extract an ASIN (`B0` followed by 8 characters) from free text.
fn extract_asin(text: &str) -> Option<String> {
    asin_pattern()
        .captures(text)
        .map(|caps| caps[1].to_string())
}

pub(super) fn generate(input: &AnalysisInput, rules: &[Rule], t: &Thresholds) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let campaigns: HashMap<i64, &CampaignSummary> = input
        .campaigns
        .iter()
        .map(|c| (c.campaign_id, c))
        .collect();
    // Terms that already run as exact keywords, plus terms emitted in
    // this run, so the same term is never harvested twice.
    let mut seen: HashSet<String> = input
        .existing_exact_keywords
        .iter()
        .map(|k| normalize_term(k))
        .collect();
    let start_date = input
        .evaluation_date
        .map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_default();

    for term in &input.search_terms {
        if !is_non_exact_source(&term.source_type) {
            continue;
        }
        let norm = normalize_term(&term.search_term);
        if norm.is_empty() || seen.contains(&norm) {
            continue;
        }

        let snap = &term.metrics;
        let mut emissions: Vec<(f64, Severity)> = Vec::new();

        if !rules.is_empty() {
            for rule in matching_rules(rules, |k| snap.get(k)) {
                if let Action::CreateCampaign { bid_multiplier } = rule.action.clamped() {
                    emissions.push((bid_multiplier, rule_severity(rule, |k| snap.get(k))));
                }
            }
        } else {
            let cvr = if snap.clicks > 0 {
                snap.orders as f64 / snap.clicks as f64
            } else {
                0.0
            };
            if snap.orders > t.orders_create_exact && cvr >= t.cvr_create_exact {
                emissions.push((
                    clamp(t.bid_multiplier, BID_MULTIPLIER_RANGE),
                    Severity::Medium,
                ));
            }
        }

        if emissions.is_empty() {
            continue;
        }
        seen.insert(norm);

        let source = campaigns.get(&term.campaign_id).copied();
        for (multiplier, severity) in emissions {
            out.push(suggestion(term, source, multiplier, severity, &start_date));
        }
    }
    out
}

fn suggestion(
    term: &SearchTermSummary,
    source: Option<&CampaignSummary>,
    bid_multiplier: f64,
    severity: Severity,
    start_date: &str,
) -> Suggestion {
    let snap = &term.metrics;
    let cpc = if snap.clicks > 0 {
        round2(snap.spend / snap.clicks as f64)
    } else {
        FALLBACK_CPC
    };
    let suggested_bid = round2(cpc * bid_multiplier);

    let source_budget = source.map(|c| c.daily_budget).unwrap_or(10.0);
    let new_budget = round2((source_budget * 0.5).max(MIN_HARVEST_BUDGET));

    // ASIN: source campaign's product data, else a B0xxxxxxxx match in a
    // campaign name.
    let asin = source
        .and_then(|c| c.asin.clone())
        .or_else(|| extract_asin(&term.campaign_name))
        .or_else(|| source.and_then(|c| extract_asin(&c.name)))
        .unwrap_or_default();
    let sku = source.and_then(|c| c.sku.clone()).unwrap_or_default();
    let portfolio_id = source
        .and_then(|c| c.portfolio_id)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let term_display: String = term.search_term.chars().take(60).collect();
    let new_name = if asin.is_empty() {
        format!("SP Kw Ex {term_display}")
    } else {
        format!("SP Kw Ex {term_display} - {asin}")
    };
    // For Create operations the platform links rows by Campaign ID =
    // Campaign Name and Ad Group ID = Ad Group Name.
    let new_id = new_name.clone();

    let actions = vec![
        BulkAction {
            entity: ENTITY_CAMPAIGN.into(),
            operation: OP_CREATE.into(),
            campaign_id: new_id.clone(),
            campaign_name: new_name.clone(),
            portfolio_id,
            start_date: start_date.into(),
            targeting_type: "Manual".into(),
            state: STATE_ENABLED.into(),
            daily_budget: money(new_budget),
            bidding_strategy: HARVEST_BIDDING_STRATEGY.into(),
            ..BulkAction::sponsored_products()
        },
        BulkAction {
            entity: ENTITY_AD_GROUP.into(),
            operation: OP_CREATE.into(),
            campaign_id: new_id.clone(),
            ad_group_id: new_id.clone(),
            campaign_name: new_name.clone(),
            ad_group_name: new_name.clone(),
            state: STATE_ENABLED.into(),
            ad_group_default_bid: money(suggested_bid),
            ..BulkAction::sponsored_products()
        },
        BulkAction {
            entity: ENTITY_PRODUCT_AD.into(),
            operation: OP_CREATE.into(),
            campaign_id: new_id.clone(),
            ad_group_id: new_id.clone(),
            campaign_name: new_name.clone(),
            ad_group_name: new_name.clone(),
            sku,
            state: STATE_ENABLED.into(),
            ..BulkAction::sponsored_products()
        },
        BulkAction {
            entity: ENTITY_KEYWORD.into(),
            operation: OP_CREATE.into(),
            campaign_id: new_id.clone(),
            ad_group_id: new_id.clone(),
            campaign_name: new_name.clone(),
            ad_group_name: new_name.clone(),
            keyword_text: term.search_term.clone(),
            match_type: "Exact".into(),
            state: STATE_ENABLED.into(),
            bid: money(suggested_bid),
            ..BulkAction::sponsored_products()
        },
        // Negate the term in the SOURCE campaign, not the new one.
        BulkAction {
            entity: ENTITY_CAMPAIGN_NEGATIVE_KEYWORD.into(),
            operation: OP_CREATE.into(),
            campaign_id: term.campaign_id.to_string(),
            campaign_name: term.campaign_name.clone(),
            keyword_text: term.search_term.clone(),
            match_type: "Negative Exact".into(),
            state: STATE_ENABLED.into(),
            ..BulkAction::sponsored_products()
        },
    ];

    Suggestion {
        id: String::new(),
        category: Category::Exact,
        severity,
        title: format!(
            "Create exact campaign for '{term_display}' - {} orders, CVR {:.0}%, ACOS {:.0}%",
            snap.orders,
            snap.cvr(),
            snap.acos()
        ),
        detail: format!(
            "This search term from '{}' converts well via {}. Create a dedicated exact \
             campaign and negate it in the source.",
            term.campaign_name, term.source_type
        ),
        metrics: json!({
            "search_term": term.search_term,
            "orders": snap.orders,
            "clicks": snap.clicks,
            "cvr": round2(snap.cvr()),
            "acos": round2(snap.acos()),
            "spend": round2(snap.spend),
            "sales": round2(snap.sales),
            "suggested_bid": suggested_bid,
            "new_budget": new_budget,
        }),
        actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricSnapshot;

    fn converting_term() -> SearchTermSummary {
        SearchTermSummary {
            search_term: "great keyword".into(),
            campaign_id: 100,
            campaign_name: "C1 - B0TEST1234".into(),
            ad_group_id: Some(200),
            ad_group_name: "AG1".into(),
            source_type: "broad".into(),
            metrics: MetricSnapshot {
                impressions: 500,
                clicks: 10,
                spend: 5.0,
                sales: 60.0,
                orders: 3,
                ..Default::default()
            },
        }
    }

    fn source_campaign() -> CampaignSummary {
        CampaignSummary {
            campaign_id: 100,
            name: "C1 - B0TEST1234".into(),
            portfolio_id: Some(77),
            daily_budget: 20.0,
            sku: Some("SKU-TEST-01".into()),
            ..Default::default()
        }
    }

    fn input() -> AnalysisInput {
        AnalysisInput {
            campaigns: vec![source_campaign()],
            search_terms: vec![converting_term()],
            ..Default::default()
        }
    }

    #[test]
    fn harvests_converting_term_with_five_actions() {
        let out = generate(&input(), &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
        let actions = &out[0].actions;
        assert_eq!(actions.len(), 5);
        let entities: Vec<&str> = actions.iter().map(|a| a.entity.as_str()).collect();
        assert_eq!(
            entities,
            [
                ENTITY_CAMPAIGN,
                ENTITY_AD_GROUP,
                ENTITY_PRODUCT_AD,
                ENTITY_KEYWORD,
                ENTITY_CAMPAIGN_NEGATIVE_KEYWORD,
            ]
        );

        let camp = &actions[0];
        assert!(camp.campaign_name.contains("great keyword"));
        assert!(camp.campaign_name.contains("B0TEST1234"));
        // Create rows link by name.
        assert_eq!(camp.campaign_id, camp.campaign_name);
        assert_eq!(camp.bidding_strategy, HARVEST_BIDDING_STRATEGY);
        assert_eq!(camp.daily_budget, "10.00");

        let ad_group = &actions[1];
        assert_eq!(ad_group.campaign_id, camp.campaign_name);
        assert_eq!(ad_group.ad_group_id, ad_group.ad_group_name);
        // CPC 0.50 * default multiplier 1.1.
        assert_eq!(ad_group.ad_group_default_bid, "0.55");

        assert_eq!(actions[2].sku, "SKU-TEST-01");
        assert_eq!(actions[3].match_type, "Exact");
        assert_eq!(actions[3].keyword_text, "great keyword");

        // Negative lands in the source campaign.
        let negative = &actions[4];
        assert_eq!(negative.campaign_id, "100");
        assert_eq!(negative.campaign_name, "C1 - B0TEST1234");
        assert_eq!(negative.match_type, "Negative Exact");
    }

    #[test]
    fn extracts_asin_from_campaign_name() {
        assert_eq!(
            extract_asin("Auto launch B0TESTASIN wide"),
            Some("B0TESTASIN".into())
        );
        assert_eq!(extract_asin("no asin here"), None);
    }

    #[test]
    fn skips_existing_exact_and_exact_sources() {
        let mut analysis = input();
        analysis.existing_exact_keywords = vec!["Great  Keyword".into()];
        assert!(generate(&analysis, &[], &Thresholds::default()).is_empty());

        let mut analysis = input();
        analysis.search_terms[0].source_type = "exact".into();
        assert!(generate(&analysis, &[], &Thresholds::default()).is_empty());
    }

    #[test]
    fn skips_low_cvr_term() {
        let mut analysis = input();
        analysis.search_terms[0].metrics.clicks = 100; // CVR 3% < 20%
        assert!(generate(&analysis, &[], &Thresholds::default()).is_empty());
    }

    #[test]
    fn term_harvested_once_across_campaigns() {
        let mut analysis = input();
        let mut second = converting_term();
        second.campaign_id = 101;
        second.campaign_name = "C2".into();
        analysis.search_terms.push(second);
        let out = generate(&analysis, &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn portfolio_propagates_from_source_campaign() {
        let out = generate(&input(), &[], &Thresholds::default());
        assert_eq!(out[0].actions[0].portfolio_id, "77");
    }
}
