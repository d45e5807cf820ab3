//! Bulk job materializer.
//!
//! Polls for jobs in `created` status, claims them atomically (at most
//! one worker per job), renders the bulk sheet CSV, and completes or
//! fails the job. Every materialization runs under a bounded timeout so
//! a wedged job is failed rather than left processing forever. Failed
//! jobs are terminal; resubmission creates a new job.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use adops_core::bulksheet::{self, BulkAction};
use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use adops_db::models::bulk_job::BulkJob;
use adops_db::repositories::BulkJobRepo;

use crate::config::ServerConfig;

/// Run the materializer loop until `cancel` is triggered.
pub async fn run(pool: PgPool, config: Arc<ServerConfig>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = config.materializer_interval_secs,
        timeout_secs = config.materializer_timeout_secs,
        output_dir = %config.bulk_output_dir,
        "Bulk job materializer started"
    );

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.materializer_interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Bulk job materializer stopping");
                break;
            }
            _ = interval.tick() => {
                drain_created_jobs(&pool, &config).await;
            }
        }
    }
}

/// Claim and process every currently claimable job.
async fn drain_created_jobs(pool: &PgPool, config: &ServerConfig) {
    loop {
        match BulkJobRepo::claim_next(pool).await {
            Ok(Some(job)) => process_job(pool, config, job).await,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim next bulk job");
                break;
            }
        }
    }
}

/// Materialize one claimed job under the configured timeout.
async fn process_job(pool: &PgPool, config: &ServerConfig, job: BulkJob) {
    let job_id = job.id;
    let timeout = Duration::from_secs(config.materializer_timeout_secs);

    let outcome = tokio::time::timeout(timeout, materialize(config, &job)).await;
    match outcome {
        Ok(Ok((output_path, summary))) => {
            match BulkJobRepo::complete(pool, job_id, &output_path, &summary).await {
                Ok(true) => {
                    tracing::info!(job_id = %job_id, path = %output_path, "Bulk job completed");
                }
                Ok(false) => {
                    tracing::warn!(
                        job_id = %job_id,
                        "Bulk job left processing before completion could be recorded"
                    );
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to record job completion");
                }
            }
        }
        Ok(Err(reason)) => fail_job(pool, job_id, &reason).await,
        Err(_) => {
            let reason = format!(
                "Materialization timed out after {}s",
                config.materializer_timeout_secs
            );
            fail_job(pool, job_id, &reason).await;
        }
    }
}

async fn fail_job(pool: &PgPool, job_id: uuid::Uuid, reason: &str) {
    tracing::error!(job_id = %job_id, reason, "Bulk job failed");
    if let Err(e) = BulkJobRepo::fail(pool, job_id, reason).await {
        tracing::error!(job_id = %job_id, error = %e, "Failed to record job failure");
    }
}

/// Render the job's actions into a CSV bulk sheet on disk.
///
/// Returns the output path and the enriched summary
/// (per-entity/per-operation counts).
async fn materialize(
    config: &ServerConfig,
    job: &BulkJob,
) -> Result<(String, serde_json::Value), String> {
    let actions: Vec<BulkAction> = serde_json::from_value(job.actions.clone())
        .map_err(|e| format!("Malformed actions payload: {e}"))?;
    if actions.is_empty() {
        return Err("Job has no actions to materialize".into());
    }

    let bytes = bulksheet::render(&actions).map_err(|e| e.to_string())?;
    let summary = bulksheet::action_summary(&actions);

    let dir = Path::new(&config.bulk_output_dir);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| format!("Failed to create output directory: {e}"))?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let id8: String = job.id.simple().to_string().chars().take(8).collect();
    let filename = format!("bulk_{timestamp}_{id8}.csv");
    let path = dir.join(filename);

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| format!("Failed to write bulk sheet: {e}"))?;

    Ok((path.to_string_lossy().into_owned(), summary))
}
