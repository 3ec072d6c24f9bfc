//! Job queue operations: idempotent enqueue and completion transitions.
//!
//! All status writes for scrape jobs go through this type. Workers claim via
//! [`JobQueue::claim`] and report outcomes via `mark_completed` /
//! `mark_failed`; nothing else mutates job status.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::job::{JobStatus, ScrapeJob};
use crate::domains::failures::{FailureKind, FailureLogEntry, WorkItemKind, WorkerError};
use crate::domains::sources::Source;

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone)]
pub enum EnqueueResult {
    /// A new job was created
    Created(Uuid),
    /// The source already had a live job (idempotency hit)
    Duplicate(Uuid),
}

impl EnqueueResult {
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a scrape job for a source, at most one live job per source.
    ///
    /// The check-then-insert race is closed by the partial unique index on
    /// live jobs: a concurrent duplicate insert silently becomes a no-op and
    /// is reported as `Duplicate`.
    pub async fn enqueue_for_source(
        &self,
        source_id: Uuid,
        trigger_kind: &str,
        max_attempts: i32,
    ) -> Result<EnqueueResult> {
        if let Some(existing) = ScrapeJob::find_active_for_source(&self.pool, source_id).await? {
            return Ok(EnqueueResult::Duplicate(existing.id));
        }

        let job = ScrapeJob::builder()
            .source_id(source_id)
            .trigger_kind(trigger_kind.to_string())
            .max_attempts(max_attempts)
            .build();

        let inserted = sqlx::query_as::<_, ScrapeJob>(
            r#"
            INSERT INTO scrape_jobs (
                id, source_id, trigger_kind, status, attempts, max_attempts,
                started_at, error_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_id) WHERE status IN ('pending', 'processing')
                DO NOTHING
            RETURNING *
            "#,
        )
        .bind(job.id)
        .bind(job.source_id)
        .bind(&job.trigger_kind)
        .bind(job.status)
        .bind(job.attempts)
        .bind(job.max_attempts)
        .bind(job.started_at)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to enqueue scrape job")?;

        match inserted {
            Some(job) => {
                info!(job_id = %job.id, source_id = %source_id, "enqueued scrape job");
                Ok(EnqueueResult::Created(job.id))
            }
            None => {
                let existing = ScrapeJob::find_active_for_source(&self.pool, source_id)
                    .await?
                    .context("Duplicate enqueue lost race with job completion")?;
                Ok(EnqueueResult::Duplicate(existing.id))
            }
        }
    }

    /// Claim up to `batch_size` pending jobs for processing.
    pub async fn claim(&self, batch_size: i64) -> Result<Vec<ScrapeJob>> {
        ScrapeJob::claim_batch(&self.pool, batch_size).await
    }

    /// Mark a job as successfully completed and clear its source's failure streak.
    pub async fn mark_completed(&self, job_id: Uuid) -> Result<()> {
        let job = sqlx::query_as::<_, ScrapeJob>(
            r#"
            UPDATE scrape_jobs
            SET status = 'completed',
                started_at = NULL,
                error_message = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark job completed")?;

        Source::record_success(&self.pool, job.source_id).await?;

        Ok(())
    }

    /// Record a job failure, reverting to `pending` while retry budget
    /// remains and going terminal `failed` otherwise.
    ///
    /// Every failure is appended to the failure log. A terminal failure also
    /// bumps the source's consecutive-failure counter.
    pub async fn mark_failed(&self, job_id: Uuid, error: &WorkerError) -> Result<JobStatus> {
        let job = ScrapeJob::find_by_id(&self.pool, job_id).await?;

        // Unclassified errors are terminal by policy
        let kind = error.failure_kind().unwrap_or(FailureKind::Validation);
        let message = error.to_string();

        FailureLogEntry::append(&self.pool, job_id, WorkItemKind::Job, kind, &message).await?;

        let retry = error.is_retryable() && job.attempts + 1 < job.max_attempts;

        let status = if retry {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };

        sqlx::query(
            r#"
            UPDATE scrape_jobs
            SET status = $1,
                attempts = attempts + 1,
                started_at = NULL,
                error_message = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(&message)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark job failed")?;

        if status == JobStatus::Failed {
            Source::record_failure(&self.pool, job.source_id).await?;
        }

        Ok(status)
    }
}
