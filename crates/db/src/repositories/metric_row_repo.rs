//! Repository for the `metric_rows` table.
//!
//! Writes are upserts keyed on `row_signature`, so re-ingesting the same
//! report is idempotent and concurrent uploads of the same rows are
//! serialized by the unique constraint (last-writer-wins on non-key
//! columns). Reads are aggregation queries: dashboard KPIs plus the
//! grouped sums the suggestion evaluator consumes.

use std::collections::HashSet;

use adops_core::report::{row_signature, RawRow};
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::metric_row::{
    AccountOption, CampaignAgg, DailyMetrics, DateRange, EntityOption, FilterOptions,
    IngestSummary, MetricFilter, PlacementAgg, SearchTermAgg, SummaryStats, TargetAgg,
};

/// Summed measure columns shared by every aggregation query. The outer
/// COALESCE keeps sums non-null over empty or all-null groups.
const MEASURE_SUMS: &str = "\
    COALESCE(SUM(impressions), 0)::BIGINT AS impressions, \
    COALESCE(SUM(clicks), 0)::BIGINT AS clicks, \
    COALESCE(SUM(cost), 0)::DOUBLE PRECISION AS spend, \
    COALESCE(SUM(sales), 0)::DOUBLE PRECISION AS sales, \
    COALESCE(SUM(orders), 0)::BIGINT AS orders, \
    COALESCE(SUM(units), 0)::BIGINT AS units";

/// Derived KPI columns over the summed measures.
const KPI_EXPRS: &str = "\
    (CASE WHEN COALESCE(SUM(impressions), 0) > 0 \
        THEN COALESCE(SUM(clicks), 0) * 100.0 / SUM(impressions) \
        ELSE 0 END)::DOUBLE PRECISION AS ctr, \
    (CASE WHEN COALESCE(SUM(clicks), 0) > 0 \
        THEN COALESCE(SUM(cost), 0) / SUM(clicks) \
        ELSE 0 END)::DOUBLE PRECISION AS cpc, \
    (CASE WHEN COALESCE(SUM(sales), 0) > 0 \
        THEN COALESCE(SUM(cost), 0) * 100.0 / SUM(sales) \
        ELSE 0 END)::DOUBLE PRECISION AS acos, \
    (CASE WHEN COALESCE(SUM(cost), 0) > 0 \
        THEN COALESCE(SUM(sales), 0) / SUM(cost) \
        ELSE 0 END)::DOUBLE PRECISION AS roas";

/// Upsert statement for one metric row, keyed on the content signature.
const UPSERT: &str = "\
    INSERT INTO metric_rows ( \
        date, week, month, year, account_id, account_name, ad_product, \
        portfolio_id, portfolio_name, campaign_id, campaign_name, \
        campaign_budget, ad_group_id, ad_group_name, placement, \
        target_value, match_type, search_term, impressions, clicks, cost, \
        sales, orders, units, cpc, source_file, row_signature) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27) \
    ON CONFLICT (row_signature) DO UPDATE SET \
        date = EXCLUDED.date, week = EXCLUDED.week, month = EXCLUDED.month, \
        year = EXCLUDED.year, account_id = EXCLUDED.account_id, \
        account_name = EXCLUDED.account_name, ad_product = EXCLUDED.ad_product, \
        portfolio_id = EXCLUDED.portfolio_id, \
        portfolio_name = EXCLUDED.portfolio_name, \
        campaign_id = EXCLUDED.campaign_id, \
        campaign_name = EXCLUDED.campaign_name, \
        campaign_budget = EXCLUDED.campaign_budget, \
        ad_group_id = EXCLUDED.ad_group_id, \
        ad_group_name = EXCLUDED.ad_group_name, \
        placement = EXCLUDED.placement, target_value = EXCLUDED.target_value, \
        match_type = EXCLUDED.match_type, search_term = EXCLUDED.search_term, \
        impressions = EXCLUDED.impressions, clicks = EXCLUDED.clicks, \
        cost = EXCLUDED.cost, sales = EXCLUDED.sales, \
        orders = EXCLUDED.orders, units = EXCLUDED.units, cpc = EXCLUDED.cpc, \
        source_file = EXCLUDED.source_file, ingested_at = NOW()";

/// Provides data access for ingested metric rows.
pub struct MetricRowRepo;

impl MetricRowRepo {
    /// Upsert a batch of parsed report rows.
    ///
    /// Rows failing validation (missing date or account id) are skipped
    /// and counted; the batch itself never fails for one bad row.
    /// Inserted/updated counts come from a pre-select of existing
    /// signatures; the unique constraint remains the correctness
    /// backstop under concurrent uploads.
    pub async fn ingest(
        pool: &PgPool,
        rows: &[RawRow],
        source_file: Option<&str>,
    ) -> Result<IngestSummary, sqlx::Error> {
        let mut summary = IngestSummary {
            parsed: rows.len() as u64,
            ..Default::default()
        };

        let mut valid: Vec<(String, &RawRow)> = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match row.validate() {
                Ok(()) => valid.push((row_signature(row), row)),
                Err(e) => {
                    summary.skipped += 1;
                    summary.errors.push(format!("row {index}: {e}"));
                }
            }
        }
        if valid.is_empty() {
            return Ok(summary);
        }

        let signatures: Vec<String> = valid.iter().map(|(sig, _)| sig.clone()).collect();
        let existing: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT row_signature FROM metric_rows WHERE row_signature = ANY($1)",
        )
        .bind(&signatures)
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

        let mut seen_in_batch: HashSet<&str> = HashSet::new();
        for (signature, row) in &valid {
            sqlx::query(UPSERT)
                .bind(row.date)
                .bind(row.derived_week())
                .bind(row.derived_month())
                .bind(row.derived_year())
                .bind(&row.account_id)
                .bind(&row.account_name)
                .bind(&row.ad_product)
                .bind(row.portfolio_id)
                .bind(&row.portfolio_name)
                .bind(row.campaign_id)
                .bind(&row.campaign_name)
                .bind(row.campaign_budget)
                .bind(row.ad_group_id)
                .bind(&row.ad_group_name)
                .bind(&row.placement)
                .bind(&row.target_value)
                .bind(&row.match_type)
                .bind(&row.search_term)
                .bind(row.impressions)
                .bind(row.clicks)
                .bind(row.cost)
                .bind(row.sales)
                .bind(row.orders)
                .bind(row.units)
                .bind(row.cpc)
                .bind(source_file)
                .bind(signature)
                .execute(pool)
                .await?;

            if existing.contains(signature.as_str()) || !seen_in_batch.insert(signature.as_str()) {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }

        tracing::info!(
            parsed = summary.parsed,
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            "Ingested metric rows"
        );
        Ok(summary)
    }

    /// One row per day with summed measures and derived KPIs.
    pub async fn daily_metrics(
        pool: &PgPool,
        filter: &MetricFilter,
    ) -> Result<Vec<DailyMetrics>, sqlx::Error> {
        let conditions = dimension_conditions(filter);
        let query = format!(
            "SELECT date, {MEASURE_SUMS}, {KPI_EXPRS} \
             FROM metric_rows WHERE {} \
             GROUP BY date ORDER BY date",
            conditions.join(" AND ")
        );
        let q = sqlx::query_as::<_, DailyMetrics>(&query)
            .bind(filter.date_from)
            .bind(filter.date_to);
        bind_dimension_filters(q, filter).fetch_all(pool).await
    }

    /// Single totals row over the range with the same derived KPIs.
    pub async fn summary_stats(
        pool: &PgPool,
        filter: &MetricFilter,
    ) -> Result<SummaryStats, sqlx::Error> {
        let conditions = dimension_conditions(filter);
        let query = format!(
            "SELECT {MEASURE_SUMS}, {KPI_EXPRS} FROM metric_rows WHERE {}",
            conditions.join(" AND ")
        );
        let q = sqlx::query_as::<_, SummaryStats>(&query)
            .bind(filter.date_from)
            .bind(filter.date_to);
        bind_dimension_filters(q, filter).fetch_one(pool).await
    }

    /// Distinct values for every filterable dimension.
    pub async fn filter_options(pool: &PgPool) -> Result<FilterOptions, sqlx::Error> {
        let accounts = sqlx::query_as::<_, AccountOption>(
            "SELECT DISTINCT account_id AS id, account_name AS name \
             FROM metric_rows ORDER BY 1",
        )
        .fetch_all(pool)
        .await?;
        let portfolios = sqlx::query_as::<_, EntityOption>(
            "SELECT DISTINCT portfolio_id AS id, portfolio_name AS name \
             FROM metric_rows WHERE portfolio_id IS NOT NULL ORDER BY 1",
        )
        .fetch_all(pool)
        .await?;
        let campaigns = sqlx::query_as::<_, EntityOption>(
            "SELECT DISTINCT campaign_id AS id, campaign_name AS name \
             FROM metric_rows WHERE campaign_id IS NOT NULL ORDER BY 1",
        )
        .fetch_all(pool)
        .await?;
        let ad_products = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT ad_product FROM metric_rows \
             WHERE ad_product IS NOT NULL ORDER BY 1",
        )
        .fetch_all(pool)
        .await?;
        let match_types = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT match_type FROM metric_rows \
             WHERE match_type IS NOT NULL ORDER BY 1",
        )
        .fetch_all(pool)
        .await?;

        Ok(FilterOptions {
            accounts,
            portfolios,
            campaigns,
            ad_products,
            match_types,
        })
    }

    /// Minimum and maximum ingested dates.
    pub async fn date_range(pool: &PgPool) -> Result<DateRange, sqlx::Error> {
        sqlx::query_as::<_, DateRange>(
            "SELECT MIN(date) AS min, MAX(date) AS max FROM metric_rows",
        )
        .fetch_one(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Evaluator input aggregates
    // -----------------------------------------------------------------------

    /// Per-campaign sums over a date range, optionally scoped.
    pub async fn campaign_summaries(
        pool: &PgPool,
        date_from: NaiveDate,
        date_to: NaiveDate,
        account_id: Option<&str>,
        portfolio_id: Option<i64>,
    ) -> Result<Vec<CampaignAgg>, sqlx::Error> {
        let mut conditions = vec![
            "date BETWEEN $1 AND $2".to_string(),
            "campaign_id IS NOT NULL".to_string(),
        ];
        scope_conditions(&mut conditions, 3, account_id, portfolio_id);
        let query = format!(
            "SELECT campaign_id, MAX(campaign_name) AS campaign_name, \
                    MAX(portfolio_id) AS portfolio_id, \
                    MAX(portfolio_name) AS portfolio_name, \
                    MAX(campaign_budget) AS campaign_budget, {MEASURE_SUMS} \
             FROM metric_rows WHERE {} \
             GROUP BY campaign_id ORDER BY campaign_id",
            conditions.join(" AND ")
        );
        let q = sqlx::query_as::<_, CampaignAgg>(&query)
            .bind(date_from)
            .bind(date_to);
        bind_scope(q, account_id, portfolio_id).fetch_all(pool).await
    }

    /// Per-target sums over a date range, optionally scoped.
    pub async fn target_summaries(
        pool: &PgPool,
        date_from: NaiveDate,
        date_to: NaiveDate,
        account_id: Option<&str>,
        portfolio_id: Option<i64>,
    ) -> Result<Vec<TargetAgg>, sqlx::Error> {
        let mut conditions = vec![
            "date BETWEEN $1 AND $2".to_string(),
            "campaign_id IS NOT NULL".to_string(),
            "target_value IS NOT NULL AND target_value <> ''".to_string(),
        ];
        scope_conditions(&mut conditions, 3, account_id, portfolio_id);
        let query = format!(
            "SELECT campaign_id, MAX(campaign_name) AS campaign_name, \
                    ad_group_id, MAX(ad_group_name) AS ad_group_name, \
                    target_value, match_type, {MEASURE_SUMS} \
             FROM metric_rows WHERE {} \
             GROUP BY campaign_id, ad_group_id, target_value, match_type \
             ORDER BY campaign_id, target_value",
            conditions.join(" AND ")
        );
        let q = sqlx::query_as::<_, TargetAgg>(&query)
            .bind(date_from)
            .bind(date_to);
        bind_scope(q, account_id, portfolio_id).fetch_all(pool).await
    }

    /// Per-search-term sums within each campaign, optionally scoped.
    pub async fn search_term_summaries(
        pool: &PgPool,
        date_from: NaiveDate,
        date_to: NaiveDate,
        account_id: Option<&str>,
        portfolio_id: Option<i64>,
    ) -> Result<Vec<SearchTermAgg>, sqlx::Error> {
        let mut conditions = vec![
            "date BETWEEN $1 AND $2".to_string(),
            "campaign_id IS NOT NULL".to_string(),
            "search_term IS NOT NULL AND search_term <> ''".to_string(),
        ];
        scope_conditions(&mut conditions, 3, account_id, portfolio_id);
        let query = format!(
            "SELECT campaign_id, MAX(campaign_name) AS campaign_name, \
                    ad_group_id, MAX(ad_group_name) AS ad_group_name, \
                    search_term, match_type, {MEASURE_SUMS} \
             FROM metric_rows WHERE {} \
             GROUP BY campaign_id, ad_group_id, search_term, match_type \
             ORDER BY campaign_id, search_term",
            conditions.join(" AND ")
        );
        let q = sqlx::query_as::<_, SearchTermAgg>(&query)
            .bind(date_from)
            .bind(date_to);
        bind_scope(q, account_id, portfolio_id).fetch_all(pool).await
    }

    /// Per-placement sums within each campaign, optionally scoped.
    pub async fn placement_summaries(
        pool: &PgPool,
        date_from: NaiveDate,
        date_to: NaiveDate,
        account_id: Option<&str>,
        portfolio_id: Option<i64>,
    ) -> Result<Vec<PlacementAgg>, sqlx::Error> {
        let mut conditions = vec![
            "date BETWEEN $1 AND $2".to_string(),
            "campaign_id IS NOT NULL".to_string(),
            "placement IS NOT NULL AND placement <> ''".to_string(),
        ];
        scope_conditions(&mut conditions, 3, account_id, portfolio_id);
        let query = format!(
            "SELECT campaign_id, placement, {MEASURE_SUMS} \
             FROM metric_rows WHERE {} \
             GROUP BY campaign_id, placement ORDER BY campaign_id, placement",
            conditions.join(" AND ")
        );
        let q = sqlx::query_as::<_, PlacementAgg>(&query)
            .bind(date_from)
            .bind(date_to);
        bind_scope(q, account_id, portfolio_id).fetch_all(pool).await
    }
}

type PgQueryAs<'q, T> = sqlx::query::QueryAs<'q, sqlx::Postgres, T, sqlx::postgres::PgArguments>;

/// WHERE clauses for a [`MetricFilter`]: date range first, then every
/// present dimension filter in declaration order (the bind order below).
fn dimension_conditions(filter: &MetricFilter) -> Vec<String> {
    let mut conditions = vec!["date BETWEEN $1 AND $2".to_string()];
    let mut bind_idx = 3;
    for (column, present) in [
        ("account_id", filter.account_id.is_some()),
        ("portfolio_id", filter.portfolio_id.is_some()),
        ("campaign_id", filter.campaign_id.is_some()),
        ("ad_group_id", filter.ad_group_id.is_some()),
        ("ad_product", filter.ad_product.is_some()),
        ("placement", filter.placement.is_some()),
        ("match_type", filter.match_type.is_some()),
    ] {
        if present {
            conditions.push(format!("{column} = ${bind_idx}"));
            bind_idx += 1;
        }
    }
    conditions
}

/// Bind the present dimension filters in the same order
/// [`dimension_conditions`] numbered them.
fn bind_dimension_filters<'q, T>(
    mut q: PgQueryAs<'q, T>,
    filter: &'q MetricFilter,
) -> PgQueryAs<'q, T> {
    if let Some(v) = &filter.account_id {
        q = q.bind(v);
    }
    if let Some(v) = filter.portfolio_id {
        q = q.bind(v);
    }
    if let Some(v) = filter.campaign_id {
        q = q.bind(v);
    }
    if let Some(v) = filter.ad_group_id {
        q = q.bind(v);
    }
    if let Some(v) = &filter.ad_product {
        q = q.bind(v);
    }
    if let Some(v) = &filter.placement {
        q = q.bind(v);
    }
    if let Some(v) = &filter.match_type {
        q = q.bind(v);
    }
    q
}

/// Append optional account/portfolio scope conditions, numbering binds
/// consecutively from `first_bind`.
fn scope_conditions(
    conditions: &mut Vec<String>,
    first_bind: u32,
    account_id: Option<&str>,
    portfolio_id: Option<i64>,
) {
    let mut bind_idx = first_bind;
    for (column, present) in [
        ("account_id", account_id.is_some()),
        ("portfolio_id", portfolio_id.is_some()),
    ] {
        if present {
            conditions.push(format!("{column} = ${bind_idx}"));
            bind_idx += 1;
        }
    }
}

/// Bind the present scope values in [`scope_conditions`] order.
fn bind_scope<'q, T>(
    mut q: PgQueryAs<'q, T>,
    account_id: Option<&'q str>,
    portfolio_id: Option<i64>,
) -> PgQueryAs<'q, T> {
    if let Some(v) = account_id {
        q = q.bind(v);
    }
    if let Some(v) = portfolio_id {
        q = q.bind(v);
    }
    q
}
