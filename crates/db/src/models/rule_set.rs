//! Rule set registry models.

use adops_core::rules::CategoryRules;
use adops_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `rule_sets` table. The document is the validated
/// category-to-rules mapping, stored opaque.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RuleSetRow {
    pub id: DbId,
    pub name: String,
    pub version: i32,
    pub document: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Listing entry: identity plus per-category rule counts.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSetSummary {
    pub name: String,
    pub version: i32,
    pub rule_count: usize,
    pub updated_at: Timestamp,
}

impl RuleSetSummary {
    /// Build a summary from a stored row. Documents are validated on
    /// write, so a parse failure here counts as zero rules rather than
    /// failing the listing.
    pub fn from_row(row: &RuleSetRow) -> Self {
        let rule_count = serde_json::from_value::<CategoryRules>(row.document.clone())
            .map(|rules| rules.rule_count())
            .unwrap_or(0);
        RuleSetSummary {
            name: row.name.clone(),
            version: row.version,
            rule_count,
            updated_at: row.updated_at,
        }
    }
}
