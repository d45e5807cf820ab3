//! Repository for the `rule_sets` table.
//!
//! The registry is read-mostly. Writes are atomic replacements of the
//! full document (no partial-category updates), so readers never observe
//! a torn rule set mid-edit. The caller validates documents before they
//! get here.

use sqlx::PgPool;

use crate::models::rule_set::RuleSetRow;

/// Column list for `rule_sets` queries.
const COLUMNS: &str = "id, name, version, document, created_at, updated_at";

/// Provides data access for rule sets.
pub struct RuleSetRepo;

impl RuleSetRepo {
    /// Get a rule set by its unique name.
    pub async fn get(pool: &PgPool, name: &str) -> Result<Option<RuleSetRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rule_sets WHERE name = $1");
        sqlx::query_as::<_, RuleSetRow>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Insert or atomically replace a rule set document by name.
    ///
    /// Replacing bumps the version.
    pub async fn put(
        pool: &PgPool,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<RuleSetRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO rule_sets (name, document) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET \
                 document = EXCLUDED.document, \
                 version = rule_sets.version + 1, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RuleSetRow>(&query)
            .bind(name)
            .bind(document)
            .fetch_one(pool)
            .await
    }

    /// List all rule sets, alphabetically.
    pub async fn list(pool: &PgPool) -> Result<Vec<RuleSetRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rule_sets ORDER BY name");
        sqlx::query_as::<_, RuleSetRow>(&query).fetch_all(pool).await
    }

    /// Seed a rule set insert-if-absent. Returns `true` when the seed
    /// inserted a new row, `false` when the name already existed.
    pub async fn seed(
        pool: &PgPool,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO rule_sets (name, document) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(document)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
