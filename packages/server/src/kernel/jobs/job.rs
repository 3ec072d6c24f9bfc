//! Scrape job model.
//!
//! One job per (source, trigger). A job is terminal at `completed`, or at
//! `failed` once its attempt budget is exhausted. The claim primitive is a
//! single SQL statement: selection, locking, and the status write commit
//! together or not at all.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "scrape_job_status", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct ScrapeJob {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub source_id: Uuid,
    #[builder(default = "scheduled".to_string())]
    pub trigger_kind: String,

    #[builder(default)]
    pub status: JobStatus,
    #[builder(default = 0)]
    pub attempts: i32,
    #[builder(default = 3)]
    pub max_attempts: i32,
    #[builder(default, setter(strip_option))]
    pub started_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl ScrapeJob {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM scrape_jobs WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .context("Scrape job not found")
    }

    /// The live (pending or processing) job for a source, if any.
    pub async fn find_active_for_source(pool: &PgPool, source_id: Uuid) -> Result<Option<Self>> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM scrape_jobs
            WHERE source_id = $1
              AND status IN ('pending', 'processing')
            LIMIT 1
            "#,
        )
        .bind(source_id)
        .fetch_optional(pool)
        .await
        .context("Failed to look up active job for source")?;

        Ok(job)
    }

    /// Claim up to `limit` pending jobs atomically using FOR UPDATE SKIP LOCKED.
    ///
    /// Rows locked by a concurrent claimant are skipped, never waited on.
    /// Returns exactly the rows whose transition to `processing` committed,
    /// oldest-created first.
    pub async fn claim_batch(pool: &PgPool, limit: i64) -> Result<Vec<Self>> {
        let mut jobs = sqlx::query_as::<_, Self>(
            r#"
            WITH next_jobs AS (
                SELECT id
                FROM scrape_jobs
                WHERE status = 'pending'
                  AND attempts < max_attempts
                ORDER BY created_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE scrape_jobs
            SET status = 'processing',
                started_at = NOW(),
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_jobs)
            RETURNING *
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to claim scrape jobs")?;

        // UPDATE .. RETURNING does not preserve the CTE ordering
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO scrape_jobs (
                id, source_id, trigger_kind, status, attempts, max_attempts,
                started_at, error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(self.source_id)
        .bind(&self.trigger_kind)
        .bind(self.status)
        .bind(self.attempts)
        .bind(self.max_attempts)
        .bind(self.started_at)
        .bind(&self.error_message)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .context("Failed to insert scrape job")?;

        Ok(job)
    }

    /// Whether this job would be eligible for a claim right now.
    pub fn is_claimable(&self) -> bool {
        self.status == JobStatus::Pending && self.attempts < self.max_attempts
    }
}
