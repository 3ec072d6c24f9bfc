// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE seams only - the actual fetch/extraction/enrichment
// algorithms live behind them and are opaque to the pipeline core.
//
// Naming convention: Base* for trait names (e.g., BaseSourceFetcher)

use async_trait::async_trait;

use crate::domains::failures::WorkerError;
use crate::domains::sources::Source;
use crate::domains::staging::StagedItem;

/// An item found while scraping a source.
#[derive(Debug, Clone)]
pub struct DiscoveredItem {
    pub url: String,
    pub raw_payload: String,
}

/// Outcome of the cheap payload classification pass.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub content_kind: String,
}

/// Finalized content produced by enrichment, ready to publish.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub title: String,
    pub body: String,
    pub metadata: serde_json::Value,
}

// =============================================================================
// Source Fetcher (network access)
// =============================================================================

#[async_trait]
pub trait BaseSourceFetcher: Send + Sync {
    /// Discover the items a source currently publishes.
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>, WorkerError>;

    /// Fetch the full content of a single item (deep scraping).
    async fn fetch_item(&self, url: &str) -> Result<String, WorkerError>;
}

// =============================================================================
// Item Processor (analysis + extraction)
// =============================================================================

#[async_trait]
pub trait BaseItemProcessor: Send + Sync {
    /// Cheap classification of a staged payload.
    async fn analyze(&self, item: &StagedItem) -> Result<Analysis, WorkerError>;

    /// Extract the structured record from the item's content.
    async fn extract(
        &self,
        item: &StagedItem,
        content: &str,
    ) -> Result<serde_json::Value, WorkerError>;
}

// =============================================================================
// Enricher (async, event-driven)
// =============================================================================

#[async_trait]
pub trait BaseEnricher: Send + Sync {
    /// Turn an extracted record into publishable content.
    async fn enrich(&self, extracted: &serde_json::Value) -> Result<Enrichment, WorkerError>;
}
