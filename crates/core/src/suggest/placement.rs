//! Placement optimization: cut exposure on placements that burn spend,
//! while re-deriving the best placement's percentage so its effective CPC
//! is preserved.
//!
//! The strategy reduces the campaign's base bids by a ratio and raises the
//! best placement's adjustment to compensate, so winning placements keep
//! their auction position while every other placement gets cheaper.

use std::collections::HashMap;

use serde_json::json;

use crate::bulksheet::{
    money, percent, BulkAction, ENTITY_BIDDING_ADJUSTMENT, OP_UPDATE, STATE_ENABLED,
};
use crate::metrics::round2;
use crate::rules::{clamp, Action, Category, Rule, PLACEMENT_PERCENTAGE_RANGE};

use super::input::{AnalysisInput, CampaignSummary, PlacementSummary, TargetEntity, TargetSummary};
use super::{Severity, Suggestion, Thresholds};

/// Minimum campaign spend before placements are worth optimizing.
const MIN_CAMPAIGN_SPEND: f64 = 5.0;

/// Bids never drop below the platform minimum.
const MIN_BID: f64 = 0.02;

/// An ineffective placement and the percentage it should move to.
struct Adjustment<'a> {
    placement: &'a PlacementSummary,
    new_pct: f64,
}

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
        let Some(placements) = placements_by_camp.get(&camp.campaign_id) else {
            continue;
        };
        if camp.metrics.spend < MIN_CAMPAIGN_SPEND {
            continue;
        }
        let targets = targets_by_camp
            .get(&camp.campaign_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if rules.is_empty() {
            // Built-in policy: a placement is ineffective when its ACOS
            // exceeds the threshold and it still has a positive adjustment.
            let mut ineffective = Vec::new();
            let mut effective = Vec::new();
            for p in placements {
                if p.metrics.spend <= 0.0 {
                    continue;
                }
                if p.metrics.acos() / 100.0 > t.acos_ineffective {
                    if p.percentage > 0.0 {
                        ineffective.push(Adjustment {
                            placement: p,
                            new_pct: 0.0,
                        });
                    }
                } else {
                    effective.push(*p);
                }
            }
            if let Some(s) = suggestion(
                camp,
                placements,
                &ineffective,
                &effective,
                targets,
                t.bid_reduction_ratio,
                t,
            ) {
                out.push(s);
            }
        } else {
            // Rule-driven: each rule classifies placements on its own and
            // emits its own suggestion, so every matching rule surfaces.
            for rule in rules {
                let mut ineffective = Vec::new();
                let mut effective = Vec::new();
                let mut rule_usable = true;
                for p in placements {
                    if p.metrics.spend <= 0.0 {
                        continue;
                    }
                    let lookup = |key: &str| match key {
                        "percentage" => Some(p.percentage),
                        other => p.metrics.get(other),
                    };
                    match rule.matches(lookup) {
                        None => {
                            tracing::warn!(
                                rule_id = %rule.id,
                                rule_name = %rule.name,
                                "Rule references an unknown metric, skipping"
                            );
                            rule_usable = false;
                            break;
                        }
                        Some(true) if p.percentage > 0.0 => {
                            let new_pct = match rule.action.clamped() {
                                Action::SetPercentage { value } => value,
                                _ => 0.0,
                            };
                            ineffective.push(Adjustment {
                                placement: p,
                                new_pct,
                            });
                        }
                        Some(_) => effective.push(*p),
                    }
                }
                if !rule_usable {
                    continue;
                }
                let reduction_ratio = match rule.action.clamped() {
                    Action::ReduceBid { ratio } => ratio,
                    _ => t.bid_reduction_ratio,
                };
                if let Some(s) = suggestion(
                    camp,
                    placements,
                    &ineffective,
                    &effective,
                    targets,
                    reduction_ratio,
                    t,
                ) {
                    out.push(s);
                }
            }
        }
    }
    out
}

fn suggestion(
    camp: &CampaignSummary,
    placements: &[&PlacementSummary],
    ineffective: &[Adjustment<'_>],
    effective: &[&PlacementSummary],
    targets: &[&TargetSummary],
    reduction_ratio: f64,
    t: &Thresholds,
) -> Option<Suggestion> {
    if ineffective.is_empty() {
        return None;
    }

    // Best placement: lowest positive ACOS among the effective ones.
    let best = effective.iter().copied().min_by(|a, b| {
        acos_key(a)
            .partial_cmp(&acos_key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let camp_cpc = camp.metrics.cpc();
    if camp_cpc <= 0.0 {
        return None;
    }

    // Back out the base bid from the campaign CPC and the best
    // placement's current adjustment, then reduce it and raise the best
    // placement so its effective CPC stays put.
    let best_pct = best.map(|p| p.percentage).unwrap_or(0.0);
    let best_factor = 1.0 + best_pct / 100.0;
    let base_bid = round2(camp_cpc / best_factor);
    let new_base = round2(base_bid * reduction_ratio).max(MIN_BID);

    let old_effective_cpc = base_bid * best_factor;
    let desired_factor = if new_base > 0.0 {
        old_effective_cpc / new_base
    } else {
        1.0
    };
    let new_best_pct = clamp(
        ((desired_factor - 1.0) * 100.0).round(),
        (PLACEMENT_PERCENTAGE_RANGE.0, t.max_placement_pct),
    );

    let mut actions = Vec::new();

    // Scale every enabled target's bid by the base reduction.
    let bid_ratio = if base_bid > 0.0 {
        new_base / base_bid
    } else {
        1.0
    };
    for target in targets {
        actions.push(target_bid_action(
            camp,
            target,
            round2(target.bid * bid_ratio).max(MIN_BID),
        ));
    }

    // Adjustment rows for every placement whose percentage changes.
    let adjusted: HashMap<&str, f64> = ineffective
        .iter()
        .map(|a| (a.placement.placement.as_str(), a.new_pct))
        .collect();
    let mut changes = Vec::new();
    for p in placements {
        let old_pct = p.percentage.round();
        let new_pct = if let Some(pct) = adjusted.get(p.placement.as_str()) {
            pct.round()
        } else if best.is_some_and(|b| b.placement == p.placement) {
            new_best_pct
        } else {
            old_pct
        };
        if new_pct != old_pct {
            changes.push(format!("{}: {old_pct}% to {new_pct}%", p.placement));
            actions.push(BulkAction {
                entity: ENTITY_BIDDING_ADJUSTMENT.into(),
                operation: OP_UPDATE.into(),
                campaign_id: camp.campaign_id.to_string(),
                campaign_name: camp.name.clone(),
                placement: p.placement.clone(),
                percentage: percent(new_pct),
                ..BulkAction::sponsored_products()
            });
        }
    }

    if actions.is_empty() {
        return None;
    }

    let ineffective_names: Vec<&str> = ineffective
        .iter()
        .map(|a| a.placement.placement.as_str())
        .collect();
    let display: String = camp.name.chars().take(40).collect();

    Some(Suggestion {
        id: String::new(),
        category: Category::Placement,
        severity: Severity::Medium,
        title: format!(
            "Adjust placements for '{display}' - ineffective: {}",
            ineffective_names.join(", ")
        ),
        detail: format!(
            "Reduce exposure on high-ACOS placements. Changes: {}. Base bid ${base_bid:.2} to ${new_base:.2}.",
            changes.join("; ")
        ),
        metrics: json!({
            "campaign_spend": round2(camp.metrics.spend),
            "campaign_acos": round2(camp.metrics.acos()),
            "ineffective_placements": ineffective.len(),
            "new_base_bid": new_base,
        }),
        actions,
    })
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

    fn placement(name: &str, percentage: f64, spend: f64, sales: f64) -> PlacementSummary {
        PlacementSummary {
            campaign_id: 1,
            placement: name.into(),
            percentage,
            metrics: MetricSnapshot {
                spend,
                sales,
                clicks: 10,
                impressions: 1000,
                ..Default::default()
            },
        }
    }

    fn analysis() -> AnalysisInput {
        AnalysisInput {
            campaigns: vec![CampaignSummary {
                campaign_id: 1,
                name: "C1".into(),
                metrics: MetricSnapshot {
                    spend: 30.0,
                    sales: 60.0,
                    clicks: 30,
                    ..Default::default()
                },
                ..Default::default()
            }],
            targets: vec![TargetSummary {
                entity: Some(TargetEntity::Keyword),
                campaign_id: 1,
                campaign_name: "C1".into(),
                ad_group_id: Some(10),
                ad_group_name: "AG1".into(),
                keyword_text: "kw".into(),
                match_type: "broad".into(),
                bid: 1.00,
                enabled: true,
                metrics: MetricSnapshot::default(),
                ..Default::default()
            }],
            placements: vec![
                // ACOS 100% with a 10% adjustment: ineffective.
                placement("Placement Product Page", 10.0, 10.0, 10.0),
                // ACOS 25%: the best placement, currently boosted 50%.
                placement("Placement Top", 50.0, 20.0, 80.0),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn reduces_base_and_boosts_best_placement() {
        let out = generate(&analysis(), &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
        let s = &out[0];

        // Campaign CPC 1.00, best factor 1.5: base bid 0.67, halved to 0.34.
        // The keyword bid scales by the same ratio.
        let keyword = &s.actions[0];
        assert_eq!(keyword.entity, "Keyword");
        assert_eq!(keyword.bid, "0.51");

        // The ineffective placement drops to 0.
        let product_page = s
            .actions
            .iter()
            .find(|a| a.placement == "Placement Product Page")
            .unwrap();
        assert_eq!(product_page.entity, ENTITY_BIDDING_ADJUSTMENT);
        assert_eq!(product_page.percentage, "0");

        // The best placement rises to keep its effective CPC:
        // 0.67 * 1.5 / 0.34 = 2.956 -> 196%.
        let top = s
            .actions
            .iter()
            .find(|a| a.placement == "Placement Top")
            .unwrap();
        assert_eq!(top.percentage, "196");
    }

    #[test]
    fn skips_low_spend_campaign() {
        let mut input = analysis();
        input.campaigns[0].metrics.spend = 3.0;
        assert!(generate(&input, &[], &Thresholds::default()).is_empty());
    }

    #[test]
    fn no_suggestion_without_ineffective_placements() {
        let mut input = analysis();
        input.placements[0].metrics.sales = 100.0; // ACOS now 10%
        assert!(generate(&input, &[], &Thresholds::default()).is_empty());
    }

    #[test]
    fn rule_set_percentage_overrides_zeroing() {
        let rules = vec![Rule {
            id: "pl-1".into(),
            name: "cap bad placements".into(),
            enabled: true,
            conditions: vec![crate::rules::Condition {
                metric: "acos".into(),
                operator: crate::rules::Comparator::Gt,
                value: 50.0,
            }],
            action: Action::SetPercentage { value: 5.0 },
        }];
        let out = generate(&analysis(), &rules, &Thresholds::default());
        assert_eq!(out.len(), 1);
        let product_page = out[0]
            .actions
            .iter()
            .find(|a| a.placement == "Placement Product Page")
            .unwrap();
        assert_eq!(product_page.percentage, "5");
    }

    #[test]
    fn best_placement_percentage_is_capped() {
        let mut input = analysis();
        // Tiny reduction base forces a huge compensating factor.
        input.campaigns[0].metrics.spend = 60.0;
        input.campaigns[0].metrics.clicks = 2; // CPC 30.00
        let mut t = Thresholds::default();
        t.bid_reduction_ratio = 0.01;
        let out = generate(&input, &[], &t);
        let top = out[0]
            .actions
            .iter()
            .find(|a| a.placement == "Placement Top")
            .unwrap();
        assert_eq!(top.percentage, "900");
    }
}
