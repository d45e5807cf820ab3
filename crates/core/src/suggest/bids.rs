//! Bid increases for campaigns that convert well below the target ACOS.

use std::collections::HashMap;

use serde_json::json;

use crate::bulksheet::{
    money, percent, BulkAction, ENTITY_BIDDING_ADJUSTMENT, OP_UPDATE, STATE_ENABLED,
};
use crate::metrics::round2;
use crate::rules::{clamp, Action, Category, Rule, PLACEMENT_PERCENTAGE_RANGE};

use super::input::{AnalysisInput, CampaignSummary, PlacementSummary, TargetEntity, TargetSummary};
use super::{matching_rules, rule_severity, Severity, Suggestion, Thresholds};

pub(super) fn generate(input: &AnalysisInput, rules: &[Rule], t: &Thresholds) -> Vec<Suggestion> {
    let mut out = Vec::new();

    let mut placements_by_camp: HashMap<i64, Vec<&PlacementSummary>> = HashMap::new();
    for p in &input.placements {
        placements_by_camp.entry(p.campaign_id).or_default().push(p);
    }
    let mut targets_by_camp: HashMap<i64, Vec<&TargetSummary>> = HashMap::new();
    for target in &input.targets {
        if target.enabled && target.bid > 0.0 {
            targets_by_camp
                .entry(target.campaign_id)
                .or_default()
                .push(target);
        }
    }

    for camp in &input.campaigns {
        let snap = &camp.metrics;
        let targets = targets_by_camp
            .get(&camp.campaign_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if !rules.is_empty() {
            // Rule-driven: the step applies to each target's bid directly,
            // new_bid = old_bid * (1 + step/100).
            for rule in matching_rules(rules, |k| snap.get(k)) {
                let Action::IncreaseBid { step } = rule.action.clamped() else {
                    continue;
                };
                let factor = 1.0 + step / 100.0;
                let actions: Vec<BulkAction> = targets
                    .iter()
                    .map(|target| {
                        target_bid_action(camp, target, round2(target.bid * factor))
                    })
                    .collect();
                if actions.is_empty() {
                    continue;
                }
                let display: String = camp.name.chars().take(40).collect();
                out.push(Suggestion {
                    id: String::new(),
                    category: Category::Bids,
                    severity: rule_severity(rule, |k| snap.get(k)),
                    title: format!(
                        "Boost '{display}' - raise bids by {step:.0}% ({} targets)",
                        actions.len()
                    ),
                    detail: format!(
                        "Matched rule '{}'. Increase every enabled target bid by {step:.0}%.",
                        rule.name
                    ),
                    metrics: json!({
                        "cvr": round2(snap.cvr()),
                        "acos": round2(snap.acos()),
                        "orders": snap.orders,
                        "spend": round2(snap.spend),
                        "sales": round2(snap.sales),
                        "step_pct": step,
                    }),
                    actions,
                });
            }
            continue;
        }

        // Built-in policy: strong campaigns only, and never past the CPC
        // that would break the target ACOS given observed CVR and AOV.
        if snap.sales <= 0.0 {
            continue;
        }
        let cvr = if snap.clicks > 0 {
            snap.orders as f64 / snap.clicks as f64
        } else {
            0.0
        };
        let acos = snap.spend / snap.sales;
        if snap.clicks < t.clicks_bid_increase
            || snap.orders < t.orders_bid_increase
            || cvr < t.cvr_bid_increase
            || acos > t.acos_bid_increase
        {
            continue;
        }
        let cpc = snap.cpc();
        if cpc <= 0.0 {
            continue;
        }
        let aov = snap.sales / snap.orders as f64;
        let max_cpc = t.acos_target_increase * cvr * aov;
        if max_cpc <= cpc {
            continue;
        }
        let new_cpc = round2((cpc * (1.0 + t.bid_increase_step)).min(max_cpc));
        let bid_ratio = new_cpc / cpc;

        let mut actions: Vec<BulkAction> = targets
            .iter()
            .map(|target| target_bid_action(camp, target, round2(target.bid * bid_ratio)))
            .collect();

        // Boost the best placement proportionally.
        if let Some(placements) = placements_by_camp.get(&camp.campaign_id) {
            let best = placements
                .iter()
                .filter(|p| p.metrics.spend > 0.0)
                .min_by(|a, b| {
                    acos_key(a)
                        .partial_cmp(&acos_key(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(best) = best {
                let old_factor = 1.0 + best.percentage / 100.0;
                let new_factor = bid_ratio * old_factor;
                let new_pct = clamp(
                    ((new_factor - 1.0) * 100.0).round(),
                    (PLACEMENT_PERCENTAGE_RANGE.0, t.max_placement_pct),
                );
                if new_pct != best.percentage.round() {
                    actions.push(BulkAction {
                        entity: ENTITY_BIDDING_ADJUSTMENT.into(),
                        operation: OP_UPDATE.into(),
                        campaign_id: camp.campaign_id.to_string(),
                        campaign_name: camp.name.clone(),
                        placement: best.placement.clone(),
                        percentage: percent(new_pct),
                        ..BulkAction::sponsored_products()
                    });
                }
            }
        }

        if actions.is_empty() {
            continue;
        }

        let display: String = camp.name.chars().take(40).collect();
        out.push(Suggestion {
            id: String::new(),
            category: Category::Bids,
            severity: Severity::Low,
            title: format!(
                "Boost '{display}' - CVR {:.0}%, ACOS {:.0}%, {} orders",
                cvr * 100.0,
                acos * 100.0,
                snap.orders
            ),
            detail: format!(
                "Strong campaign. Suggested CPC increase: ${cpc:.2} to ${new_cpc:.2}. \
                 Max CPC at {:.0}% ACOS target: ${max_cpc:.2}.",
                t.acos_target_increase * 100.0
            ),
            metrics: json!({
                "cvr": round2(cvr * 100.0),
                "acos": round2(acos * 100.0),
                "orders": snap.orders,
                "spend": round2(snap.spend),
                "sales": round2(snap.sales),
                "current_cpc": round2(cpc),
                "suggested_cpc": new_cpc,
                "max_cpc": round2(max_cpc),
            }),
            actions,
        });
    }
    out
}

fn acos_key(p: &PlacementSummary) -> f64 {
    let acos = p.metrics.acos();
    if acos > 0.0 {
        acos
    } else {
        9999.0
    }
}

fn target_bid_action(camp: &CampaignSummary, target: &TargetSummary, new_bid: f64) -> BulkAction {
    let mut action = BulkAction {
        entity: target.entity_kind().as_str().into(),
        operation: OP_UPDATE.into(),
        campaign_id: camp.campaign_id.to_string(),
        campaign_name: camp.name.clone(),
        ad_group_id: target
            .ad_group_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        ad_group_name: target.ad_group_name.clone(),
        bid: money(new_bid),
        state: STATE_ENABLED.into(),
        ..BulkAction::sponsored_products()
    };
    match target.entity_kind() {
        TargetEntity::Keyword => {
            action.keyword_text = target.keyword_text.clone();
            action.match_type = target.match_type.clone();
        }
        TargetEntity::ProductTargeting => {
            action.product_targeting_expression = target.product_targeting_expression.clone();
        }
    }
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricSnapshot;
    use crate::rules::{Comparator, Condition};

    fn strong_campaign() -> CampaignSummary {
        CampaignSummary {
            campaign_id: 1,
            name: "Winner".into(),
            metrics: MetricSnapshot {
                impressions: 2000,
                clicks: 20,
                spend: 12.0, // CPC 0.60
                sales: 100.0,
                orders: 8, // CVR 40%, ACOS 12%
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn keyword_target(bid: f64) -> TargetSummary {
        TargetSummary {
            entity: Some(TargetEntity::Keyword),
            campaign_id: 1,
            campaign_name: "Winner".into(),
            ad_group_id: Some(10),
            ad_group_name: "AG1".into(),
            keyword_text: "kw".into(),
            match_type: "exact".into(),
            bid,
            enabled: true,
            metrics: MetricSnapshot::default(),
            ..Default::default()
        }
    }

    fn analysis() -> AnalysisInput {
        AnalysisInput {
            campaigns: vec![strong_campaign()],
            targets: vec![keyword_target(1.00)],
            ..Default::default()
        }
    }

    #[test]
    fn boosts_strong_campaign_by_step() {
        let out = generate(&analysis(), &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
        // CPC 0.60 * 1.15 = 0.69, well under max CPC (0.25 * 0.4 * 12.5
        // = 1.25), so the step applies in full and bids scale by 1.15.
        assert_eq!(out[0].actions[0].bid, "1.15");
        assert_eq!(out[0].severity, Severity::Low);
    }

    #[test]
    fn new_cpc_is_capped_at_target_acos_ceiling() {
        let mut input = analysis();
        input.campaigns[0].metrics.spend = 20.0; // CPC 1.00, ACOS 20%
        let mut t = Thresholds::default();
        t.acos_target_increase = 0.22; // max CPC = 0.22 * 0.4 * 12.5 = 1.10
        let out = generate(&input, &[], &t);
        assert_eq!(out.len(), 1);
        // Ceiling binds: ratio 1.10, not 1.15.
        assert_eq!(out[0].actions[0].bid, "1.10");
    }

    #[test]
    fn skips_weak_campaigns() {
        let mut input = analysis();
        input.campaigns[0].metrics.orders = 2; // below orders gate
        assert!(generate(&input, &[], &Thresholds::default()).is_empty());

        let mut input = analysis();
        input.campaigns[0].metrics.sales = 20.0; // ACOS 50% > 20%
        assert!(generate(&input, &[], &Thresholds::default()).is_empty());
    }

    #[test]
    fn oversized_rule_step_is_clamped_to_100() {
        let rules = vec![Rule {
            id: "bid-1".into(),
            name: "aggressive".into(),
            enabled: true,
            conditions: vec![Condition {
                metric: "orders".into(),
                operator: Comparator::Ge,
                value: 1.0,
            }],
            action: Action::IncreaseBid { step: 500.0 },
        }];
        let out = generate(&analysis(), &rules, &Thresholds::default());
        assert_eq!(out.len(), 1);
        // Step clamps to 100%: the bid doubles rather than sextupling.
        assert_eq!(out[0].actions[0].bid, "2.00");
    }

    #[test]
    fn boosts_best_placement_when_present() {
        let mut input = analysis();
        input.placements = vec![PlacementSummary {
            campaign_id: 1,
            placement: "Placement Top".into(),
            percentage: 20.0,
            metrics: MetricSnapshot {
                spend: 5.0,
                sales: 50.0,
                clicks: 10,
                ..Default::default()
            },
        }];
        let out = generate(&input, &[], &Thresholds::default());
        let adjustment = out[0]
            .actions
            .iter()
            .find(|a| a.entity == ENTITY_BIDDING_ADJUSTMENT)
            .unwrap();
        // Ratio 1.15 on factor 1.2: 1.38 -> 38%.
        assert_eq!(adjustment.percentage, "38");
    }
}
