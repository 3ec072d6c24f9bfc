//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The trigger endpoints stay the source of truth for on-demand runs; these
//! schedules keep the pipeline moving without an external cron:
//! - Coordination sweep + worker drain every 5 minutes
//! - Stuck-work reclaim every 10 minutes
//!
//! ```text
//! Scheduler (every 5 minutes)
//!     │
//!     ├─► Coordinator::run (enqueue due sources)
//!     ├─► ScrapeWorker::run_once (drain job queue)
//!     ├─► ProcessWorker::run_once (drain staging)
//!     └─► EnrichmentWorker::run_once (drain awaiting entries)
//! ```

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::PipelineConfig;
use crate::kernel::coordinator::{CoordinationFilter, Coordinator};
use crate::kernel::reclaimer::Reclaimer;
use crate::kernel::traits::{BaseEnricher, BaseItemProcessor, BaseSourceFetcher};
use crate::kernel::workers::{EnrichmentWorker, ProcessOptions, ProcessWorker, ScrapeWorker};

/// Opaque domain-logic implementations shared by the scheduler and the
/// trigger surface.
#[derive(Clone)]
pub struct PipelineDeps {
    pub fetcher: Arc<dyn BaseSourceFetcher>,
    pub processor: Arc<dyn BaseItemProcessor>,
    pub enricher: Arc<dyn BaseEnricher>,
}

/// Start all scheduled tasks
pub async fn start_scheduler(
    pool: PgPool,
    config: PipelineConfig,
    deps: PipelineDeps,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Pipeline sweep - every 5 minutes
    let sweep_pool = pool.clone();
    let sweep_config = config.clone();
    let sweep_deps = deps.clone();
    let sweep_job = Job::new_async("0 */5 * * * *", move |_uuid, _lock| {
        let pool = sweep_pool.clone();
        let config = sweep_config.clone();
        let deps = sweep_deps.clone();
        Box::pin(async move {
            if let Err(e) = run_pipeline_sweep(pool, config, deps).await {
                tracing::error!("Pipeline sweep failed: {}", e);
            }
        })
    })?;
    scheduler.add(sweep_job).await?;

    // Stuck-work reclaim - every 10 minutes
    let reclaim_pool = pool.clone();
    let reclaim_config = config.clone();
    let reclaim_job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
        let pool = reclaim_pool.clone();
        let config = reclaim_config.clone();
        Box::pin(async move {
            if let Err(e) = Reclaimer::new(pool, config).reclaim_stuck().await {
                tracing::error!("Reclaim task failed: {}", e);
            }
        })
    })?;
    scheduler.add(reclaim_job).await?;

    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (pipeline sweep every 5 minutes, reclaim every 10)");
    Ok(scheduler)
}

/// One full sweep: coordinate, then drain each queue in dataflow order.
async fn run_pipeline_sweep(
    pool: PgPool,
    config: PipelineConfig,
    deps: PipelineDeps,
) -> Result<()> {
    let outcome = Coordinator::new(pool.clone(), config.clone())
        .run(CoordinationFilter::default())
        .await?;
    tracing::info!(
        jobs_created = outcome.jobs_created,
        "scheduled coordination complete"
    );

    let scraped = ScrapeWorker::new(pool.clone(), deps.fetcher.clone(), config.clone())
        .run_once()
        .await?;

    let processed = ProcessWorker::new(
        pool.clone(),
        deps.processor.clone(),
        deps.fetcher.clone(),
        config.clone(),
    )
    .run_once(&ProcessOptions::default())
    .await?;

    let enriched = EnrichmentWorker::new(pool, deps.enricher.clone(), config)
        .run_once()
        .await?;

    tracing::info!(scraped, processed, enriched, "scheduled pipeline sweep complete");
    Ok(())
}
