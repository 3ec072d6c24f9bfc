//! Scrape worker: turns claimed scrape jobs into staged items.
//!
//! # Architecture
//!
//! ```text
//! ScrapeWorker
//!     │
//!     ├─► JobQueue::claim (batch, SKIP LOCKED)
//!     ├─► BaseSourceFetcher::discover (per job)
//!     ├─► StagedItem::create_with_entry (per discovered item, deduplicated)
//!     └─► JobQueue::mark_completed / mark_failed
//! ```

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::domains::failures::WorkerError;
use crate::domains::sources::Source;
use crate::domains::staging::StagedItem;
use crate::kernel::jobs::{JobQueue, ScrapeJob};
use crate::kernel::traits::BaseSourceFetcher;

pub struct ScrapeWorker {
    pool: PgPool,
    queue: JobQueue,
    fetcher: Arc<dyn BaseSourceFetcher>,
    config: PipelineConfig,
}

impl ScrapeWorker {
    pub fn new(pool: PgPool, fetcher: Arc<dyn BaseSourceFetcher>, config: PipelineConfig) -> Self {
        let queue = JobQueue::new(pool.clone());
        Self {
            pool,
            queue,
            fetcher,
            config,
        }
    }

    /// Process claimed jobs until a claim returns an empty batch.
    ///
    /// Returns the number of jobs handled this invocation. Per-item errors
    /// are recorded against the job; infrastructure errors abort the
    /// invocation and propagate.
    pub async fn run_once(&self) -> Result<usize> {
        let mut processed = 0;

        loop {
            let jobs = self.queue.claim(self.config.claim_batch_size).await?;
            if jobs.is_empty() {
                break;
            }

            debug!(count = jobs.len(), "claimed scrape jobs");

            for job in jobs {
                match self.handle_job(&job).await {
                    Ok(staged) => {
                        info!(job_id = %job.id, staged, "scrape job succeeded");
                        self.queue.mark_completed(job.id).await?;
                    }
                    Err(WorkerError::Infra(e)) => return Err(e),
                    Err(e) => {
                        warn!(job_id = %job.id, error = %e, "scrape job failed");
                        self.queue.mark_failed(job.id, &e).await?;
                    }
                }
                processed += 1;
            }
        }

        Ok(processed)
    }

    /// Fetch one source and stage everything it published. Returns the
    /// number of newly staged items.
    async fn handle_job(&self, job: &ScrapeJob) -> Result<usize, WorkerError> {
        let source = Source::find_by_id(&self.pool, job.source_id).await?;
        let items = self.fetcher.discover(&source).await?;

        let mut staged = 0;
        for item in items {
            let created =
                StagedItem::create_with_entry(&self.pool, source.id, &item.url, &item.raw_payload)
                    .await?;
            if created.is_some() {
                staged += 1;
            }
        }

        Ok(staged)
    }
}
