//! Append-only failure log.
//!
//! Every recorded worker failure and every reclaimed abandonment lands here.
//! Entries are immutable: the model exposes insert and read operations only.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Classified failure cause, persisted alongside each log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "failure_kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Network/timeout while fetching - retryable
    TransientFetch,
    /// Malformed payload - retryable up to the ceiling, then terminal
    ContentParse,
    /// Schema mismatch - terminal
    Validation,
    /// Worker died mid-claim - recovered by the Reclaimer, never counted
    /// against content-level retry budget
    CrashAbandonment,
}

/// Which queue the failed item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "work_item_kind", rename_all = "snake_case")]
pub enum WorkItemKind {
    Job,
    StagedItem,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FailureLogEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_kind: WorkItemKind,
    pub error_kind: FailureKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl FailureLogEntry {
    /// Append a failure record. Entries are never updated or deleted.
    pub async fn append(
        pool: &PgPool,
        item_id: Uuid,
        item_kind: WorkItemKind,
        error_kind: FailureKind,
        message: &str,
    ) -> Result<Self> {
        let entry = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO failure_log (id, item_id, item_kind, error_kind, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_id)
        .bind(item_kind)
        .bind(error_kind)
        .bind(message)
        .fetch_one(pool)
        .await
        .context("Failed to append failure log entry")?;

        Ok(entry)
    }

    /// All failures recorded for an item, oldest first.
    pub async fn list_for_item(pool: &PgPool, item_id: Uuid) -> Result<Vec<Self>> {
        let entries = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM failure_log
            WHERE item_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(item_id)
        .fetch_all(pool)
        .await
        .context("Failed to list failure log entries")?;

        Ok(entries)
    }

    pub async fn count_for_item(pool: &PgPool, item_id: Uuid) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM failure_log WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(pool)
                .await
                .context("Failed to count failure log entries")?;

        Ok(count)
    }
}
