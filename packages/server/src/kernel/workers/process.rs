//! Process worker: advances staged items through the pipeline stages.
//!
//! Each claim of a staged item performs exactly one unit of work and moves
//! its pipeline entry exactly one stage forward. The item returns to the
//! pool after every non-final step, so a batch of claimants can interleave
//! freely without any item skipping a stage.
//!
//! # Architecture
//!
//! ```text
//! ProcessWorker
//!     │
//!     ├─► StagedItem::claim_batch (batch, SKIP LOCKED, retry ceiling)
//!     ├─► per item, one step by current stage:
//!     │     discovered      → analyze            → analyzing
//!     │     analyzing       → decide fetch       → awaiting_fetch
//!     │     awaiting_fetch  → fetch + extract    → extracted
//!     │     extracted       → validate + persist → ready_to_persist (item done,
//!     │                                            enrichment requested)
//!     └─► on failure: retry below ceiling, else terminal + failure log
//! ```

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::domains::failures::{FailureKind, WorkerError};
use crate::domains::pipeline::{EnrichmentState, PipelineEntry, PipelineStage};
use crate::domains::staging::StagedItem;
use crate::kernel::traits::{BaseItemProcessor, BaseSourceFetcher};

/// Per-invocation options for the process worker.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Fetch full item content at the awaiting_fetch step instead of reusing
    /// the staged payload
    pub enable_deep_scraping: bool,
}

pub struct ProcessWorker {
    pool: PgPool,
    processor: Arc<dyn BaseItemProcessor>,
    fetcher: Arc<dyn BaseSourceFetcher>,
    config: PipelineConfig,
}

impl ProcessWorker {
    pub fn new(
        pool: PgPool,
        processor: Arc<dyn BaseItemProcessor>,
        fetcher: Arc<dyn BaseSourceFetcher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            pool,
            processor,
            fetcher,
            config,
        }
    }

    /// Process claimed staged items until a claim returns an empty batch.
    ///
    /// Returns the number of units of work completed or failed this
    /// invocation. Infrastructure errors abort and propagate.
    pub async fn run_once(&self, opts: &ProcessOptions) -> Result<usize> {
        let mut processed = 0;

        loop {
            let items = StagedItem::claim_batch(
                &self.pool,
                self.config.claim_batch_size,
                self.config.staging_max_retries,
            )
            .await?;

            if items.is_empty() {
                break;
            }

            debug!(count = items.len(), "claimed staged items");

            for item in items {
                match self.handle_item(&item, opts).await {
                    Ok(stage) => {
                        debug!(item_id = %item.id, stage = ?stage, "staged item advanced");
                    }
                    Err(WorkerError::Infra(e)) => return Err(e),
                    Err(e) => {
                        warn!(item_id = %item.id, error = %e, "staged item step failed");
                        self.record_item_failure(&item, &e).await?;
                    }
                }
                processed += 1;
            }
        }

        Ok(processed)
    }

    /// Run one pipeline step for a claimed item. Returns the stage reached.
    async fn handle_item(
        &self,
        item: &StagedItem,
        opts: &ProcessOptions,
    ) -> Result<PipelineStage, WorkerError> {
        let entry = PipelineEntry::find_by_staged_item(&self.pool, item.id).await?;

        match entry.stage {
            PipelineStage::Discovered => {
                let analysis = self.processor.analyze(item).await?;
                debug!(item_id = %item.id, kind = %analysis.content_kind, "analyzed payload");
                let entry = self.advance(&entry, PipelineStage::Analyzing).await?;
                item.release_for_next_step(&self.pool).await?;
                Ok(entry.stage)
            }

            PipelineStage::Analyzing => {
                let entry = self.advance(&entry, PipelineStage::AwaitingFetch).await?;
                item.release_for_next_step(&self.pool).await?;
                Ok(entry.stage)
            }

            PipelineStage::AwaitingFetch => {
                let content = if opts.enable_deep_scraping {
                    self.fetcher.fetch_item(&item.url).await?
                } else {
                    item.raw_payload.clone()
                };

                let extracted = self.processor.extract(item, &content).await?;
                let entry = self.advance(&entry, PipelineStage::Extracted).await?;
                item.store_extracted(&self.pool, &extracted).await?;
                Ok(entry.stage)
            }

            PipelineStage::Extracted => {
                // A crash between the stage advance and store_extracted can
                // leave the record missing; re-extract from the payload.
                let extracted = match &item.extracted {
                    Some(value) => value.clone(),
                    None => self.processor.extract(item, &item.raw_payload).await?,
                };

                validate_extracted(&extracted)?;

                let entry = self.advance(&entry, PipelineStage::ReadyToPersist).await?;
                entry
                    .set_enrichment(&self.pool, EnrichmentState::AwaitingEnrichment)
                    .await?;
                item.mark_done(&self.pool, &extracted).await?;
                Ok(entry.stage)
            }

            // Crash between the final advance and item retirement: finish
            // the bookkeeping.
            PipelineStage::ReadyToPersist | PipelineStage::Indexed => {
                let extracted = item
                    .extracted
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({}));
                item.mark_done(&self.pool, &extracted).await?;
                Ok(entry.stage)
            }
        }
    }

    async fn advance(
        &self,
        entry: &PipelineEntry,
        to: PipelineStage,
    ) -> Result<PipelineEntry, WorkerError> {
        entry
            .advance(&self.pool, to)
            .await
            .map_err(|e| WorkerError::Infra(anyhow::anyhow!(e)))
    }

    /// Explicit per-item failure policy: recoverable errors consume one
    /// retry and return to the pool; terminal errors and exhausted budgets
    /// end the item.
    async fn record_item_failure(&self, item: &StagedItem, error: &WorkerError) -> Result<()> {
        let kind = error.failure_kind().unwrap_or(FailureKind::Validation);
        let message = error.to_string();

        if error.is_retryable() && item.retry_count + 1 < self.config.staging_max_retries {
            item.mark_retry(&self.pool, kind, &message).await
        } else {
            item.mark_failed(&self.pool, kind, &message).await
        }
    }
}

fn validate_extracted(extracted: &serde_json::Value) -> Result<(), WorkerError> {
    let has_title = extracted
        .get("title")
        .and_then(|t| t.as_str())
        .is_some_and(|t| !t.trim().is_empty());
    let has_body = extracted
        .get("body")
        .and_then(|b| b.as_str())
        .is_some_and(|b| !b.trim().is_empty());

    if !has_title {
        return Err(WorkerError::Validation(
            "extracted record missing title".to_string(),
        ));
    }
    if !has_body {
        return Err(WorkerError::Validation(
            "extracted record missing body".to_string(),
        ));
    }

    Ok(())
}
