//! Aggregated performance measures and derived ratios.
//!
//! A [`MetricSnapshot`] is the per-entity aggregate (campaign, target,
//! placement, or search term) the evaluator reasons about. Derived ratios
//! follow the reporting convention: CTR, CVR, and ACOS are percentages
//! (35.0 means 35%), CPC is currency, ROAS is a plain multiple.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Summed measures for one entity over the evaluation window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub units: i64,
}

impl MetricSnapshot {
    /// Click-through rate as a percentage.
    pub fn ctr(&self) -> f64 {
        if self.impressions > 0 {
            self.clicks as f64 / self.impressions as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Conversion rate (orders per click) as a percentage.
    pub fn cvr(&self) -> f64 {
        if self.clicks > 0 {
            self.orders as f64 / self.clicks as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Advertising cost of sales as a percentage. Zero when there are no sales.
    pub fn acos(&self) -> f64 {
        if self.sales > 0.0 {
            self.spend / self.sales * 100.0
        } else {
            0.0
        }
    }

    /// Average cost per click.
    pub fn cpc(&self) -> f64 {
        if self.clicks > 0 {
            self.spend / self.clicks as f64
        } else {
            0.0
        }
    }

    /// Return on ad spend. Zero when there is no spend.
    pub fn roas(&self) -> f64 {
        if self.spend > 0.0 {
            self.sales / self.spend
        } else {
            0.0
        }
    }

    /// Look up a raw or derived measure by its metric key.
    ///
    /// Returns `None` for keys this snapshot does not carry, so the caller
    /// can distinguish "metric is zero" from "metric does not exist" when
    /// evaluating rule conditions.
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "impressions" => Some(self.impressions as f64),
            "clicks" => Some(self.clicks as f64),
            "spend" => Some(self.spend),
            "sales" => Some(self.sales),
            "orders" => Some(self.orders as f64),
            "units" => Some(self.units as f64),
            "ctr" => Some(self.ctr()),
            "cvr" => Some(self.cvr()),
            "acos" => Some(self.acos()),
            "cpc" => Some(self.cpc()),
            "roas" => Some(self.roas()),
            _ => None,
        }
    }

    /// Render the snapshot as a flat metric map for suggestion payloads.
    pub fn to_map(&self) -> HashMap<String, f64> {
        let keys = [
            "impressions",
            "clicks",
            "spend",
            "sales",
            "orders",
            "units",
            "ctr",
            "cvr",
            "acos",
            "cpc",
            "roas",
        ];
        keys.iter()
            .map(|k| (k.to_string(), round2(self.get(k).unwrap_or(0.0))))
            .collect()
    }
}

/// Round a value to two decimal places for display payloads.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MetricSnapshot {
        MetricSnapshot {
            impressions: 1000,
            clicks: 20,
            spend: 10.0,
            sales: 40.0,
            orders: 4,
            units: 5,
        }
    }

    #[test]
    fn derived_ratios() {
        let s = snapshot();
        assert_eq!(s.ctr(), 2.0);
        assert_eq!(s.cvr(), 20.0);
        assert_eq!(s.acos(), 25.0);
        assert_eq!(s.cpc(), 0.5);
        assert_eq!(s.roas(), 4.0);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let s = MetricSnapshot::default();
        assert_eq!(s.ctr(), 0.0);
        assert_eq!(s.cvr(), 0.0);
        assert_eq!(s.acos(), 0.0);
        assert_eq!(s.cpc(), 0.0);
        assert_eq!(s.roas(), 0.0);
    }

    #[test]
    fn lookup_by_key() {
        let s = snapshot();
        assert_eq!(s.get("clicks"), Some(20.0));
        assert_eq!(s.get("acos"), Some(25.0));
        assert_eq!(s.get("no_such_metric"), None);
    }

    #[test]
    fn map_contains_all_keys() {
        let map = snapshot().to_map();
        assert_eq!(map.len(), 11);
        assert_eq!(map["cvr"], 20.0);
    }
}
