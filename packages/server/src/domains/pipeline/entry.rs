//! Pipeline entry model - one row per staged item, tracking its stage.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::stage::{EnrichmentState, PipelineStage, StageError};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PipelineEntry {
    pub id: Uuid,
    pub staged_item_id: Uuid,
    pub stage: PipelineStage,
    pub enrichment: EnrichmentState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineEntry {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM pipeline_entries WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .context("Pipeline entry not found")
    }

    pub async fn find_by_staged_item(pool: &PgPool, staged_item_id: Uuid) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM pipeline_entries WHERE staged_item_id = $1")
            .bind(staged_item_id)
            .fetch_one(pool)
            .await
            .context("Pipeline entry not found for staged item")
    }

    /// Advance exactly one stage forward.
    ///
    /// Anything other than the single next stage is rejected before touching
    /// the store. The write itself is guarded on the expected current stage,
    /// so a concurrent advance cannot produce a skip.
    pub async fn advance(&self, pool: &PgPool, to: PipelineStage) -> Result<Self, StageError> {
        self.stage.check_transition(to)?;

        let updated = sqlx::query_as::<_, Self>(
            r#"
            UPDATE pipeline_entries
            SET stage = $1,
                updated_at = NOW()
            WHERE id = $2 AND stage = $3
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(self.id)
        .bind(self.stage)
        .fetch_optional(pool)
        .await
        .map_err(|e| StageError::Store(e.to_string()))?;

        updated.ok_or(StageError::ConcurrentChange {
            expected: self.stage,
        })
    }

    /// Explicit reset path: back to `discovered`, enrichment cleared.
    ///
    /// The only sanctioned backward move; used by operators re-running an
    /// item from scratch.
    pub async fn reset_to_discovered(&self, pool: &PgPool) -> Result<Self> {
        let entry = sqlx::query_as::<_, Self>(
            r#"
            UPDATE pipeline_entries
            SET stage = 'discovered',
                enrichment = 'none',
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .fetch_one(pool)
        .await
        .context("Failed to reset pipeline entry")?;

        tracing::info!(entry_id = %self.id, "pipeline entry reset to discovered");

        Ok(entry)
    }

    /// Move the enrichment substate; independent of the coarse stage.
    pub async fn set_enrichment(&self, pool: &PgPool, state: EnrichmentState) -> Result<Self> {
        let entry = sqlx::query_as::<_, Self>(
            r#"
            UPDATE pipeline_entries
            SET enrichment = $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(state)
        .bind(self.id)
        .fetch_one(pool)
        .await
        .context("Failed to update enrichment state")?;

        Ok(entry)
    }

    /// Entries waiting for the event-driven enrichment pass.
    pub async fn find_awaiting_enrichment(pool: &PgPool, limit: i64) -> Result<Vec<Self>> {
        let entries = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM pipeline_entries
            WHERE stage = 'ready_to_persist'
              AND enrichment = 'awaiting_enrichment'
            ORDER BY updated_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list entries awaiting enrichment")?;

        Ok(entries)
    }
}
