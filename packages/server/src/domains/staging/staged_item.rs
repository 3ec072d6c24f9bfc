//! Staged item model - raw fetched content held between scrape and publish.
//!
//! Same claim shape as the job queue, with one extra eligibility condition:
//! the retry ceiling. A row that exhausts its ceiling goes terminal `failed`
//! and never reappears in a claim.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::failures::{FailureKind, FailureLogEntry, WorkItemKind};
use crate::domains::pipeline::PipelineEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "staged_item_status", rename_all = "snake_case")]
pub enum StagedItemStatus {
    #[default]
    Pending,
    Processing,
    Failed,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StagedItem {
    pub id: Uuid,
    pub source_id: Uuid,
    pub url: String,
    pub raw_payload: String,
    pub extracted: Option<serde_json::Value>,
    pub status: StagedItemStatus,
    pub retry_count: i32,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StagedItem {
    /// Stage a discovered item and open its pipeline entry, atomically.
    ///
    /// Deduplicated on (source, url): re-discovering a known item is a no-op
    /// and returns `None`.
    pub async fn create_with_entry(
        pool: &PgPool,
        source_id: Uuid,
        url: &str,
        raw_payload: &str,
    ) -> Result<Option<(Self, PipelineEntry)>> {
        let mut tx = pool.begin().await?;

        let item = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO staged_items (id, source_id, url, raw_payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (source_id, url) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(url)
        .bind(raw_payload)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to stage item")?;

        let Some(item) = item else {
            tx.rollback().await?;
            return Ok(None);
        };

        let entry = sqlx::query_as::<_, PipelineEntry>(
            r#"
            INSERT INTO pipeline_entries (id, staged_item_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item.id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to open pipeline entry")?;

        tx.commit().await?;

        tracing::debug!(
            item_id = %item.id,
            source_id = %source_id,
            url = %url,
            "staged discovered item"
        );

        Ok(Some((item, entry)))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM staged_items WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .context("Staged item not found")
    }

    /// Claim up to `limit` pending items atomically using FOR UPDATE SKIP LOCKED.
    ///
    /// Eligibility additionally requires the retry ceiling not be exhausted.
    /// Returns exactly the rows whose transition committed, oldest first.
    pub async fn claim_batch(pool: &PgPool, limit: i64, max_retries: i32) -> Result<Vec<Self>> {
        let mut items = sqlx::query_as::<_, Self>(
            r#"
            WITH next_items AS (
                SELECT id
                FROM staged_items
                WHERE status = 'pending'
                  AND (retry_count IS NULL OR retry_count < $2)
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE staged_items
            SET status = 'processing',
                processing_started_at = NOW(),
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_items)
            RETURNING *
            "#,
        )
        .bind(limit)
        .bind(max_retries)
        .fetch_all(pool)
        .await
        .context("Failed to claim staged items")?;

        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    /// Recoverable failure: consume one retry and return the row to the pool.
    pub async fn mark_retry(&self, pool: &PgPool, kind: FailureKind, message: &str) -> Result<()> {
        FailureLogEntry::append(pool, self.id, WorkItemKind::StagedItem, kind, message).await?;

        sqlx::query(
            r#"
            UPDATE staged_items
            SET status = 'pending',
                retry_count = retry_count + 1,
                processing_started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .execute(pool)
        .await
        .context("Failed to mark staged item for retry")?;

        Ok(())
    }

    /// Terminal failure: the row is excluded from all future claims.
    pub async fn mark_failed(&self, pool: &PgPool, kind: FailureKind, message: &str) -> Result<()> {
        FailureLogEntry::append(pool, self.id, WorkItemKind::StagedItem, kind, message).await?;

        sqlx::query(
            r#"
            UPDATE staged_items
            SET status = 'failed',
                retry_count = retry_count + 1,
                processing_started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .execute(pool)
        .await
        .context("Failed to mark staged item failed")?;

        Ok(())
    }

    /// Completed one pipeline step; release for the next claim.
    ///
    /// Not a retry: the counter is untouched.
    pub async fn release_for_next_step(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE staged_items
            SET status = 'pending',
                processing_started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .execute(pool)
        .await
        .context("Failed to release staged item")?;

        Ok(())
    }

    /// Store the extracted record and release for the next claim.
    pub async fn store_extracted(&self, pool: &PgPool, extracted: &serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE staged_items
            SET extracted = $1,
                status = 'pending',
                processing_started_at = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(extracted)
        .bind(self.id)
        .execute(pool)
        .await
        .context("Failed to store extracted record")?;

        Ok(())
    }

    /// Store the extracted record and retire the row from claiming.
    pub async fn mark_done(&self, pool: &PgPool, extracted: &serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE staged_items
            SET status = 'done',
                extracted = $1,
                processing_started_at = NULL,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(extracted)
        .bind(self.id)
        .execute(pool)
        .await
        .context("Failed to mark staged item done")?;

        Ok(())
    }
}
