//! Coordinator: selects due sources and enqueues scrape jobs.
//!
//! # Architecture
//!
//! ```text
//! Coordinator
//!     │
//!     ├─► Source::find_due (enabled + schedule, or explicit ids)
//!     ├─► JobQueue::enqueue_for_source (idempotent, one live job per source)
//!     └─► Source::schedule_next (health-adjusted interval)
//! ```
//!
//! Enqueue is idempotent: a source with a live job is counted as targeted
//! but gets no second job. Backpressure comes entirely from only enqueuing
//! sources that are actually due.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::kernel::jobs::JobQueue;
use crate::domains::sources::Source;

/// Narrowing options for a coordination sweep.
#[derive(Debug, Clone, Default)]
pub struct CoordinationFilter {
    /// Restrict the sweep to these sources
    pub source_ids: Option<Vec<Uuid>>,
    /// Ignore the schedule (still honors the enabled flag)
    pub force: bool,
    /// Bound on sources per sweep
    pub limit: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CoordinationOutcome {
    pub jobs_created: usize,
    pub sources_targeted: Vec<Uuid>,
}

pub struct Coordinator {
    pool: PgPool,
    queue: JobQueue,
    config: PipelineConfig,
}

impl Coordinator {
    pub fn new(pool: PgPool, config: PipelineConfig) -> Self {
        let queue = JobQueue::new(pool.clone());
        Self {
            pool,
            queue,
            config,
        }
    }

    /// One coordination sweep: enqueue jobs for due sources and advance
    /// their schedules.
    pub async fn run(&self, filter: CoordinationFilter) -> Result<CoordinationOutcome> {
        let limit = filter.limit.unwrap_or(50);
        let trigger_kind = if filter.force { "manual" } else { "scheduled" };

        let sources = Source::find_due(
            &self.pool,
            filter.source_ids.as_deref(),
            filter.force,
            limit,
        )
        .await?;

        if sources.is_empty() {
            return Ok(CoordinationOutcome {
                jobs_created: 0,
                sources_targeted: Vec::new(),
            });
        }

        let mut jobs_created = 0;
        let mut sources_targeted = Vec::with_capacity(sources.len());

        for source in sources {
            let result = self
                .queue
                .enqueue_for_source(source.id, trigger_kind, self.config.job_max_attempts)
                .await?;

            if result.is_created() {
                jobs_created += 1;
            } else {
                tracing::debug!(
                    source_id = %source.id,
                    job_id = %result.job_id(),
                    "source already has a live job, skipping enqueue"
                );
            }

            // Advance the schedule either way so a stuck job cannot make the
            // coordinator hot-loop on one source.
            source.schedule_next(&self.pool, &self.config).await?;
            sources_targeted.push(source.id);
        }

        info!(
            jobs_created,
            sources_targeted = sources_targeted.len(),
            "coordination sweep complete"
        );

        Ok(CoordinationOutcome {
            jobs_created,
            sources_targeted,
        })
    }
}
