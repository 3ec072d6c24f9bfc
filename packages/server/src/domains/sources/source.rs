//! Source model - registered external content sources.
//!
//! Each source carries its own scrape schedule and health counters. The
//! Coordinator is the only component that creates jobs from sources; a
//! disabled source is invisible to it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::config::PipelineConfig;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Source {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub name: String,
    pub url: String,

    #[builder(default = true)]
    pub enabled: bool,
    #[builder(default = 3600)]
    pub scrape_interval_secs: i64,
    #[builder(default = Utc::now())]
    pub next_scrape_at: DateTime<Utc>,
    #[builder(default = 0)]
    pub consecutive_failures: i32,
    #[builder(default, setter(strip_option))]
    pub last_success_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

/// Backoff multiplier for a source with the given failure streak.
///
/// Doubles per consecutive failure, capped at `max_intervals`. A healthy
/// source (zero failures) stays at its baseline interval.
pub fn backoff_intervals(consecutive_failures: i32, max_intervals: i64) -> i64 {
    if consecutive_failures <= 0 {
        return 1;
    }
    if consecutive_failures >= 62 {
        return max_intervals.max(1);
    }
    (1i64 << consecutive_failures).min(max_intervals.max(1))
}

impl Source {
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let source = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO sources (
                id, name, url, enabled, scrape_interval_secs, next_scrape_at,
                consecutive_failures, last_success_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.url)
        .bind(self.enabled)
        .bind(self.scrape_interval_secs)
        .bind(self.next_scrape_at)
        .bind(self.consecutive_failures)
        .bind(self.last_success_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .context("Failed to insert source")?;

        Ok(source)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .context("Source not found")
    }

    /// Enabled sources due for scraping.
    ///
    /// `ids` narrows the sweep to explicit sources; `force` ignores the
    /// schedule (but never the enabled flag). Ordered most-overdue first.
    pub async fn find_due(
        pool: &PgPool,
        ids: Option<&[Uuid]>,
        force: bool,
        limit: i64,
    ) -> Result<Vec<Self>> {
        let sources = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM sources
            WHERE enabled = TRUE
              AND ($1 OR next_scrape_at <= NOW())
              AND ($2::uuid[] IS NULL OR id = ANY($2))
            ORDER BY next_scrape_at
            LIMIT $3
            "#,
        )
        .bind(force)
        .bind(ids.map(|ids| ids.to_vec()))
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to find due sources")?;

        Ok(sources)
    }

    /// Advance `next_scrape_at` by the health-adjusted interval.
    ///
    /// Called by the Coordinator at enqueue time so a source is not targeted
    /// again until its next slot, regardless of how the job turns out.
    pub async fn schedule_next(&self, pool: &PgPool, config: &PipelineConfig) -> Result<()> {
        let intervals = backoff_intervals(self.consecutive_failures, config.max_backoff_intervals);
        let delay_secs = self.scrape_interval_secs.saturating_mul(intervals);

        sqlx::query(
            r#"
            UPDATE sources
            SET next_scrape_at = NOW() + ($1 || ' seconds')::INTERVAL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(delay_secs.to_string())
        .bind(self.id)
        .execute(pool)
        .await
        .context("Failed to schedule next scrape")?;

        Ok(())
    }

    /// Record a successful scrape: clears the failure streak.
    pub async fn record_success(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sources
            SET consecutive_failures = 0,
                last_success_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to record source success")?;

        Ok(())
    }

    /// Record a terminally failed scrape job against this source.
    pub async fn record_failure(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sources
            SET consecutive_failures = consecutive_failures + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to record source failure")?;

        Ok(())
    }
}
