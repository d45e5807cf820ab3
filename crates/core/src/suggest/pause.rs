//! Pause suggestions: campaigns and targets spending with no conversions.

use std::collections::HashMap;

use serde_json::json;

use crate::bulksheet::{BulkAction, ENTITY_CAMPAIGN, OP_UPDATE, STATE_PAUSED};
use crate::metrics::round2;
use crate::rules::{Category, Rule};

use super::input::{AnalysisInput, CampaignSummary, TargetEntity, TargetSummary};
use super::{matching_rules, rule_severity, Severity, Suggestion, Thresholds};

pub(super) fn generate(input: &AnalysisInput, rules: &[Rule], t: &Thresholds) -> Vec<Suggestion> {
    let mut out = Vec::new();

    // Campaigns.
    for camp in &input.campaigns {
        let snap = &camp.metrics;
        let severities = if !rules.is_empty() {
            matching_rules(rules, |k| snap.get(k))
                .into_iter()
                .map(|rule| rule_severity(rule, |k| snap.get(k)))
                .collect()
        } else if snap.spend >= t.spend_campaign_pause && snap.orders == 0 {
            vec![Severity::High]
        } else {
            Vec::new()
        };
        for severity in severities {
            out.push(campaign_suggestion(camp, severity));
        }
    }

    // Targets. A target that is its campaign's only target escalates to
    // pausing the campaign itself.
    let mut targets_per_campaign: HashMap<i64, usize> = HashMap::new();
    for target in &input.targets {
        *targets_per_campaign.entry(target.campaign_id).or_default() += 1;
    }

    for target in &input.targets {
        let snap = &target.metrics;
        let lookup = |key: &str| match key {
            "bid" => Some(target.bid),
            other => snap.get(other),
        };
        let severities: Vec<Severity> = if !rules.is_empty() {
            matching_rules(rules, lookup)
                .into_iter()
                .map(|rule| rule_severity(rule, lookup))
                .collect()
        } else if snap.spend >= t.spend_target_pause && snap.orders == 0 {
            vec![Severity::High]
        } else {
            Vec::new()
        };
        if severities.is_empty() {
            continue;
        }

        let sole_target = targets_per_campaign
            .get(&target.campaign_id)
            .copied()
            .unwrap_or(0)
            <= 1;
        for severity in severities {
            out.push(target_suggestion(target, sole_target, severity));
        }
    }

    out
}

fn campaign_suggestion(camp: &CampaignSummary, severity: Severity) -> Suggestion {
    let snap = &camp.metrics;
    let display: String = camp.name.chars().take(50).collect();
    Suggestion {
        id: String::new(),
        category: Category::Pause,
        severity,
        title: format!(
            "Pause '{display}' - ${:.2} spend, {} orders",
            snap.spend, snap.orders
        ),
        detail: "Campaign is spending with no conversions.".into(),
        metrics: json!({
            "spend": round2(snap.spend),
            "orders": snap.orders,
            "clicks": snap.clicks,
            "impressions": snap.impressions,
            "cpc": round2(snap.cpc()),
        }),
        actions: vec![pause_campaign_action(camp.campaign_id, &camp.name)],
    }
}

fn target_suggestion(target: &TargetSummary, sole_target: bool, severity: Severity) -> Suggestion {
    let snap = &target.metrics;
    let label: String = target.label().chars().take(40).collect();
    let campaign: String = target.campaign_name.chars().take(40).collect();

    if sole_target {
        return Suggestion {
            id: String::new(),
            category: Category::Pause,
            severity,
            title: format!(
                "Pause campaign '{campaign}' (sole target '{label}') - ${:.2}, 0 orders",
                snap.spend
            ),
            detail: "Only target in campaign is unprofitable. Pause the entire campaign.".into(),
            metrics: json!({
                "target": target.label(),
                "spend": round2(snap.spend),
                "clicks": snap.clicks,
                "orders": snap.orders,
            }),
            actions: vec![pause_campaign_action(target.campaign_id, &target.campaign_name)],
        };
    }

    let entity = target.entity_kind();
    let mut action = BulkAction {
        entity: entity.as_str().into(),
        operation: OP_UPDATE.into(),
        campaign_id: target.campaign_id.to_string(),
        ad_group_id: target
            .ad_group_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        state: STATE_PAUSED.into(),
        ..BulkAction::sponsored_products()
    };
    match entity {
        TargetEntity::Keyword => {
            action.keyword_text = target.keyword_text.clone();
            action.match_type = target.match_type.clone();
        }
        TargetEntity::ProductTargeting => {
            action.product_targeting_expression = target.product_targeting_expression.clone();
        }
    }

    let entity_label = entity.as_str().to_lowercase();
    Suggestion {
        id: String::new(),
        category: Category::Pause,
        severity,
        title: format!(
            "Pause {entity_label} '{label}' in '{campaign}' - ${:.2}, 0 orders",
            snap.spend
        ),
        detail: format!("This {entity_label} is wasting spend with no conversions."),
        metrics: json!({
            "target": target.label(),
            "spend": round2(snap.spend),
            "clicks": snap.clicks,
            "orders": snap.orders,
            "campaign": target.campaign_name,
        }),
        actions: vec![action],
    }
}

fn pause_campaign_action(campaign_id: i64, name: &str) -> BulkAction {
    BulkAction {
        entity: ENTITY_CAMPAIGN.into(),
        operation: OP_UPDATE.into(),
        campaign_id: campaign_id.to_string(),
        campaign_name: name.into(),
        state: STATE_PAUSED.into(),
        ..BulkAction::sponsored_products()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulksheet::ENTITY_KEYWORD;
    use crate::metrics::MetricSnapshot;

    fn campaign(spend: f64, orders: i64) -> CampaignSummary {
        CampaignSummary {
            campaign_id: 1,
            name: "C1".into(),
            metrics: MetricSnapshot {
                spend,
                orders,
                clicks: 20,
                sales: if orders > 0 { 30.0 } else { 0.0 },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn keyword_target(campaign_id: i64, spend: f64, orders: i64) -> TargetSummary {
        TargetSummary {
            entity: Some(TargetEntity::Keyword),
            campaign_id,
            campaign_name: "C1".into(),
            ad_group_id: Some(10),
            ad_group_name: "AG1".into(),
            keyword_text: "slow keyword".into(),
            match_type: "broad".into(),
            bid: 0.75,
            enabled: true,
            metrics: MetricSnapshot {
                spend,
                orders,
                clicks: 14,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn pauses_zero_order_campaign() {
        let input = AnalysisInput {
            campaigns: vec![campaign(20.0, 0)],
            ..Default::default()
        };
        let out = generate(&input, &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].actions[0].entity, ENTITY_CAMPAIGN);
        assert_eq!(out[0].actions[0].state, STATE_PAUSED);
    }

    #[test]
    fn skips_profitable_and_low_spend_campaigns() {
        let input = AnalysisInput {
            campaigns: vec![campaign(20.0, 3), campaign(4.0, 0)],
            ..Default::default()
        };
        let out = generate(&input, &[], &Thresholds::default());
        assert!(out.is_empty());
    }

    #[test]
    fn pauses_target_with_zero_orders() {
        let input = AnalysisInput {
            targets: vec![keyword_target(1, 12.0, 0), keyword_target(1, 1.0, 2)],
            ..Default::default()
        };
        let out = generate(&input, &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
        let action = &out[0].actions[0];
        assert_eq!(action.entity, ENTITY_KEYWORD);
        assert_eq!(action.state, STATE_PAUSED);
        assert_eq!(action.keyword_text, "slow keyword");
        assert_eq!(action.match_type, "broad");
    }

    #[test]
    fn sole_target_escalates_to_campaign_pause() {
        let input = AnalysisInput {
            targets: vec![keyword_target(1, 12.0, 0)],
            ..Default::default()
        };
        let out = generate(&input, &[], &Thresholds::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].actions[0].entity, ENTITY_CAMPAIGN);
        assert_eq!(out[0].actions[0].campaign_id, "1");
    }
}
