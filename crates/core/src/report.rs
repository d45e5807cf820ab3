//! Raw report rows and their deduplication signatures.
//!
//! A [`RawRow`] is one reporting-period observation for one entity, already
//! parsed out of the uploaded report by an external collaborator. The store
//! deduplicates on [`row_signature`], a SHA-256 digest over every dimension
//! and measure field. Ingestion metadata (source file, ingestion timestamp)
//! is deliberately excluded so that re-uploading the same report produces
//! the same signatures.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hashing::sha256_hex;

/// One parsed report row, as delivered by the upload parser.
///
/// `date` and `account_id` are the only required fields; everything else is
/// optional because the advertising platform emits different column subsets
/// per report type (campaign, placement, search-term, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow {
    pub date: Option<NaiveDate>,
    pub week: Option<i32>,
    pub month: Option<i32>,
    pub year: Option<i32>,

    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub ad_product: Option<String>,
    pub portfolio_id: Option<i64>,
    pub portfolio_name: Option<String>,
    pub campaign_id: Option<i64>,
    pub campaign_name: Option<String>,
    pub campaign_budget: Option<f64>,
    pub ad_group_id: Option<i64>,
    pub ad_group_name: Option<String>,

    pub placement: Option<String>,
    pub target_value: Option<String>,
    pub match_type: Option<String>,
    pub search_term: Option<String>,

    pub impressions: Option<i64>,
    pub clicks: Option<i64>,
    pub cost: Option<f64>,
    pub sales: Option<f64>,
    pub orders: Option<i64>,
    pub units: Option<i64>,
    pub cpc: Option<f64>,
}

impl RawRow {
    /// Check that the fields every stored row must carry are present.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.date.is_none() {
            return Err(CoreError::Validation(
                "Row is missing required field 'date'".into(),
            ));
        }
        match &self.account_id {
            Some(id) if !id.trim().is_empty() => Ok(()),
            _ => Err(CoreError::Validation(
                "Row is missing required field 'account_id'".into(),
            )),
        }
    }

    /// Derived ISO week, falling back to the reported value when present.
    pub fn derived_week(&self) -> Option<i32> {
        self.week
            .or_else(|| self.date.map(|d| d.iso_week().week() as i32))
    }

    /// Derived calendar month.
    pub fn derived_month(&self) -> Option<i32> {
        self.month.or_else(|| self.date.map(|d| d.month() as i32))
    }

    /// Derived calendar year.
    pub fn derived_year(&self) -> Option<i32> {
        self.year.or_else(|| self.date.map(|d| d.year()))
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

fn push_text(parts: &mut Vec<String>, value: &Option<String>) {
    parts.push(
        value
            .as_deref()
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_default(),
    );
}

fn push_int(parts: &mut Vec<String>, value: Option<i64>) {
    parts.push(value.map(|v| v.to_string()).unwrap_or_default());
}

fn push_float(parts: &mut Vec<String>, value: Option<f64>) {
    parts.push(value.map(|v| v.to_string()).unwrap_or_default());
}

/// Compute the deduplication signature for a row.
///
/// The serialization is a fixed field order, each value trimmed and
/// lowercased (text) or rendered canonically (numbers), absent values as
/// empty strings, joined with `|`. Two rows with identical dimension and
/// measure fields hash identically regardless of when or from which file
/// they were ingested.
pub fn row_signature(row: &RawRow) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(24);

    parts.push(
        row.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    );
    push_text(&mut parts, &row.account_id);
    push_text(&mut parts, &row.ad_product);
    push_int(&mut parts, row.portfolio_id);
    push_int(&mut parts, row.campaign_id);
    push_int(&mut parts, row.ad_group_id);
    push_text(&mut parts, &row.placement);
    push_text(&mut parts, &row.target_value);
    push_text(&mut parts, &row.match_type);
    push_text(&mut parts, &row.search_term);
    push_int(&mut parts, row.impressions);
    push_int(&mut parts, row.clicks);
    push_float(&mut parts, row.cost);
    push_float(&mut parts, row.sales);
    push_int(&mut parts, row.orders);
    push_int(&mut parts, row.units);
    push_float(&mut parts, row.cpc);
    push_float(&mut parts, row.campaign_budget);

    sha256_hex(parts.join("|").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> RawRow {
        RawRow {
            date: NaiveDate::from_ymd_opt(2026, 1, 19),
            account_id: Some("A1".into()),
            campaign_id: Some(100),
            campaign_name: Some("Campaign One".into()),
            search_term: Some("wireless charger".into()),
            impressions: Some(1000),
            clicks: Some(15),
            cost: Some(8.25),
            sales: Some(0.0),
            orders: Some(0),
            ..Default::default()
        }
    }

    #[test]
    fn signature_is_deterministic() {
        let row = sample_row();
        assert_eq!(row_signature(&row), row_signature(&row));
        assert_eq!(row_signature(&row).len(), 64);
    }

    #[test]
    fn signature_ignores_name_casing_and_whitespace() {
        let a = RawRow {
            search_term: Some("Wireless Charger".into()),
            ..sample_row()
        };
        let b = RawRow {
            search_term: Some("  wireless charger ".into()),
            ..sample_row()
        };
        assert_eq!(row_signature(&a), row_signature(&b));
    }

    #[test]
    fn signature_changes_with_measures() {
        let a = sample_row();
        let b = RawRow {
            clicks: Some(16),
            ..sample_row()
        };
        assert_ne!(row_signature(&a), row_signature(&b));
    }

    #[test]
    fn signature_changes_with_dimensions() {
        let a = sample_row();
        let b = RawRow {
            campaign_id: Some(101),
            ..sample_row()
        };
        assert_ne!(row_signature(&a), row_signature(&b));
    }

    #[test]
    fn validate_requires_date_and_account() {
        assert!(sample_row().validate().is_ok());

        let no_date = RawRow {
            date: None,
            ..sample_row()
        };
        assert!(no_date.validate().is_err());

        let no_account = RawRow {
            account_id: Some("  ".into()),
            ..sample_row()
        };
        assert!(no_account.validate().is_err());
    }

    #[test]
    fn calendar_fields_derive_from_date() {
        let row = sample_row();
        assert_eq!(row.derived_year(), Some(2026));
        assert_eq!(row.derived_month(), Some(1));
        assert_eq!(row.derived_week(), Some(4));
    }

    #[test]
    fn reported_calendar_fields_win_over_derived() {
        let row = RawRow {
            week: Some(3),
            ..sample_row()
        };
        assert_eq!(row.derived_week(), Some(3));
    }
}
