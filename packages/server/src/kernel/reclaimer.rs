//! Stuck-work reclaimer.
//!
//! The sole safety net against worker-process death mid-claim: a `processing`
//! row whose start timestamp has aged past the staleness threshold is reset
//! to `pending` with its timestamp cleared, making it visible to claims
//! again. Retry counters are preserved by default - abandonment is not a
//! content failure and only increments on recorded worker errors - but
//! `reset_counters_on_reclaim` can zero them instead.
//!
//! Each reclaimed row gets a `crash_abandonment` failure-log entry. With no
//! newly stalled rows, a sweep returns 0 and writes nothing.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;

pub struct Reclaimer {
    pool: PgPool,
    config: PipelineConfig,
}

impl Reclaimer {
    pub fn new(pool: PgPool, config: PipelineConfig) -> Self {
        Self { pool, config }
    }

    /// Sweep both queues for abandoned claims. Returns the reclaimed count.
    pub async fn reclaim_stuck(&self) -> Result<u64> {
        let jobs = self.reclaim_jobs().await?;
        let items = self.reclaim_staged_items().await?;

        let total = jobs + items;
        if total > 0 {
            warn!(jobs, staged_items = items, "reclaimed abandoned claims");
        } else {
            info!("no stalled claims found");
        }

        Ok(total)
    }

    async fn reclaim_jobs(&self) -> Result<u64> {
        let reclaimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            WITH stale AS (
                SELECT id
                FROM scrape_jobs
                WHERE status = 'processing'
                  AND started_at < NOW() - ($1 || ' seconds')::INTERVAL
                FOR UPDATE SKIP LOCKED
            ),
            reclaimed AS (
                UPDATE scrape_jobs
                SET status = 'pending',
                    started_at = NULL,
                    attempts = CASE WHEN $2 THEN 0 ELSE attempts END,
                    updated_at = NOW()
                WHERE id IN (SELECT id FROM stale)
                RETURNING id
            )
            INSERT INTO failure_log (id, item_id, item_kind, error_kind, message)
            SELECT gen_random_uuid(), id, 'job', 'crash_abandonment', $3
            FROM reclaimed
            RETURNING item_id
            "#,
        )
        .bind(self.config.stale_claim_secs.to_string())
        .bind(self.config.reset_counters_on_reclaim)
        .bind("claim abandoned past staleness threshold; reset to pending")
        .fetch_all(&self.pool)
        .await
        .context("Failed to reclaim stuck scrape jobs")?;

        Ok(reclaimed.len() as u64)
    }

    async fn reclaim_staged_items(&self) -> Result<u64> {
        let reclaimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            WITH stale AS (
                SELECT id
                FROM staged_items
                WHERE status = 'processing'
                  AND processing_started_at < NOW() - ($1 || ' seconds')::INTERVAL
                FOR UPDATE SKIP LOCKED
            ),
            reclaimed AS (
                UPDATE staged_items
                SET status = 'pending',
                    processing_started_at = NULL,
                    retry_count = CASE WHEN $2 THEN 0 ELSE retry_count END,
                    updated_at = NOW()
                WHERE id IN (SELECT id FROM stale)
                RETURNING id
            )
            INSERT INTO failure_log (id, item_id, item_kind, error_kind, message)
            SELECT gen_random_uuid(), id, 'staged_item', 'crash_abandonment', $3
            FROM reclaimed
            RETURNING item_id
            "#,
        )
        .bind(self.config.stale_claim_secs.to_string())
        .bind(self.config.reset_counters_on_reclaim)
        .bind("claim abandoned past staleness threshold; reset to pending")
        .fetch_all(&self.pool)
        .await
        .context("Failed to reclaim stuck staged items")?;

        Ok(reclaimed.len() as u64)
    }
}
