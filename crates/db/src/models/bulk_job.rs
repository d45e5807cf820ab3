//! Bulk job models and DTOs.

use adops_core::bulksheet::BulkAction;
use adops_core::types::Timestamp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::StatusId;

/// A row from the `bulk_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BulkJob {
    pub id: Uuid,
    pub account_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub rule_set_name: Option<String>,
    pub status_id: StatusId,
    /// The submitted actions, in bulk sheet row form.
    pub actions: serde_json::Value,
    pub summary: serde_json::Value,
    pub error_message: Option<String>,
    pub output_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for submitting a new bulk job via `POST /api/v1/jobs`.
#[derive(Debug, Deserialize)]
pub struct SubmitBulkJob {
    /// User-approved actions, each in bulk sheet row form.
    pub actions: Vec<BulkAction>,
    pub account_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub rule_set: Option<String>,
}
