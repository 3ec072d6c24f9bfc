//! Enrichment worker: event-driven finalization of extracted items.
//!
//! Unlike the scrape and process workers, enrichment is not claim-driven:
//! it is invoked per entry by a webhook or internal event once the entry
//! reaches `ready_to_persist` with enrichment requested. Redelivery is safe -
//! an entry that is not in the awaiting state is reported as such, not
//! re-enriched.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::domains::articles::Article;
use crate::domains::failures::{FailureKind, FailureLogEntry, WorkItemKind, WorkerError};
use crate::domains::pipeline::{EnrichmentState, PipelineEntry, PipelineStage};
use crate::domains::staging::StagedItem;
use crate::kernel::traits::BaseEnricher;

/// Outcome of one enrichment invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// A new article was published
    Published(Uuid),
    /// Content fingerprint already published; entry still advanced
    Duplicate,
    /// Entry was not awaiting enrichment (e.g. webhook redelivery)
    NotReady,
}

pub struct EnrichmentWorker {
    pool: PgPool,
    enricher: Arc<dyn BaseEnricher>,
    config: PipelineConfig,
}

impl EnrichmentWorker {
    pub fn new(pool: PgPool, enricher: Arc<dyn BaseEnricher>, config: PipelineConfig) -> Self {
        Self {
            pool,
            enricher,
            config,
        }
    }

    /// Enrich a single entry: publish the article and retire the entry at
    /// `indexed`.
    pub async fn handle_entry(&self, entry_id: Uuid) -> Result<EnrichOutcome> {
        let entry = PipelineEntry::find_by_id(&self.pool, entry_id).await?;

        if entry.stage != PipelineStage::ReadyToPersist
            || entry.enrichment != EnrichmentState::AwaitingEnrichment
        {
            debug!(
                entry_id = %entry_id,
                stage = ?entry.stage,
                enrichment = ?entry.enrichment,
                "entry not awaiting enrichment"
            );
            return Ok(EnrichOutcome::NotReady);
        }

        let item = StagedItem::find_by_id(&self.pool, entry.staged_item_id).await?;
        let extracted = item
            .extracted
            .as_ref()
            .context("staged item has no extracted record")?;

        let enrichment = match self.enricher.enrich(extracted).await {
            Ok(enrichment) => enrichment,
            Err(WorkerError::Infra(e)) => return Err(e),
            Err(e) => {
                let kind = e.failure_kind().unwrap_or(FailureKind::Validation);
                warn!(entry_id = %entry_id, error = %e, "enrichment failed");
                FailureLogEntry::append(
                    &self.pool,
                    item.id,
                    WorkItemKind::StagedItem,
                    kind,
                    &e.to_string(),
                )
                .await?;
                return Err(anyhow::Error::new(e));
            }
        };

        let article = Article::publish(
            &self.pool,
            item.id,
            item.source_id,
            &enrichment.title,
            &enrichment.body,
            &enrichment.metadata,
        )
        .await?;

        let entry = entry
            .set_enrichment(&self.pool, EnrichmentState::ReadyToIndex)
            .await?;
        entry
            .advance(&self.pool, PipelineStage::Indexed)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        info!(entry_id = %entry_id, "entry enriched and indexed");

        Ok(match article {
            Some(article) => EnrichOutcome::Published(article.id),
            None => EnrichOutcome::Duplicate,
        })
    }

    /// Drain everything currently awaiting enrichment.
    ///
    /// Convenience driver for deployments without an event bus; the webhook
    /// path calls [`Self::handle_entry`] directly.
    pub async fn run_once(&self) -> Result<usize> {
        let mut processed = 0;
        let mut failed = 0usize;

        loop {
            let entries =
                PipelineEntry::find_awaiting_enrichment(&self.pool, self.config.claim_batch_size)
                    .await?;
            if entries.is_empty() {
                break;
            }

            for entry in entries {
                match self.handle_entry(entry.id).await {
                    Ok(_) => {}
                    Err(e) => {
                        failed += 1;
                        warn!(entry_id = %entry.id, error = %e, "enrichment pass skipped entry");
                    }
                }
                processed += 1;
            }

            // Failed entries are still awaiting enrichment; stop rather than
            // spin on them within this invocation.
            if failed > 0 {
                break;
            }
        }

        Ok(processed)
    }
}
