//! Repository for the `bulk_jobs` table.
//!
//! Status transitions are guarded UPDATEs, so they stay monotonic even
//! under concurrent workers: a job leaves `created` exactly once
//! (claimed with `FOR UPDATE SKIP LOCKED`), and a terminal job accepts
//! no further transition.

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::bulk_job::BulkJob;
use crate::models::status::BulkJobStatus;

/// Column list for `bulk_jobs` queries.
const COLUMNS: &str = "\
    id, account_id, date_from, date_to, rule_set_name, status_id, \
    actions, summary, error_message, output_path, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Scope fields recorded on a new job.
#[derive(Debug, Default)]
pub struct JobScope<'a> {
    pub account_id: Option<&'a str>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub rule_set_name: Option<&'a str>,
}

/// Provides data access for bulk jobs.
pub struct BulkJobRepo;

impl BulkJobRepo {
    /// Persist a new job in `created` status with its actions payload
    /// and initial summary.
    pub async fn create(
        pool: &PgPool,
        actions: &serde_json::Value,
        summary: &serde_json::Value,
        scope: &JobScope<'_>,
    ) -> Result<BulkJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO bulk_jobs \
                 (id, account_id, date_from, date_to, rule_set_name, \
                  status_id, actions, summary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkJob>(&query)
            .bind(Uuid::new_v4())
            .bind(scope.account_id)
            .bind(scope.date_from)
            .bind(scope.date_to)
            .bind(scope.rule_set_name)
            .bind(BulkJobStatus::Created.id())
            .bind(actions)
            .bind(summary)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest `created` job for materialization.
    ///
    /// `FOR UPDATE SKIP LOCKED` guarantees at most one worker claims a
    /// given job when multiple materializers run.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<BulkJob>, sqlx::Error> {
        let query = format!(
            "UPDATE bulk_jobs \
             SET status_id = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM bulk_jobs \
                 WHERE status_id = $2 \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BulkJob>(&query)
            .bind(BulkJobStatus::Processing.id())
            .bind(BulkJobStatus::Created.id())
            .fetch_optional(pool)
            .await
    }

    /// Complete a processing job with its output file and enriched
    /// summary. Returns `false` if the job was not in `processing`
    /// (terminal jobs accept no further transition).
    pub async fn complete(
        pool: &PgPool,
        job_id: Uuid,
        output_path: &str,
        summary: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bulk_jobs \
             SET status_id = $2, output_path = $3, summary = $4, updated_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(job_id)
        .bind(BulkJobStatus::Completed.id())
        .bind(output_path)
        .bind(summary)
        .bind(BulkJobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail a processing job with a captured reason. Terminal: failed
    /// jobs are never retried automatically, resubmission creates a new
    /// job. Returns `false` if the job was not in `processing`.
    pub async fn fail(pool: &PgPool, job_id: Uuid, error: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE bulk_jobs \
             SET status_id = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1 AND status_id = $4",
        )
        .bind(job_id)
        .bind(BulkJobStatus::Failed.id())
        .bind(error)
        .bind(BulkJobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<BulkJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bulk_jobs WHERE id = $1");
        sqlx::query_as::<_, BulkJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs newest first, paginated.
    pub async fn list(
        pool: &PgPool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<BulkJob>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM bulk_jobs \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, BulkJob>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
