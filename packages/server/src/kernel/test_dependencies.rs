// TestDependencies - mock implementations for testing
//
// Provides mock fetcher/processor/enricher implementations that can be
// injected into the workers for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domains::failures::WorkerError;
use crate::domains::sources::Source;
use crate::domains::staging::StagedItem;
use crate::kernel::traits::{
    Analysis, BaseEnricher, BaseItemProcessor, BaseSourceFetcher, DiscoveredItem, Enrichment,
};

/// A failure a mock should produce, cloneable for scripting.
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    TransientFetch(String),
    ContentParse(String),
    Validation(String),
}

impl ScriptedFailure {
    pub fn to_error(&self) -> WorkerError {
        match self {
            ScriptedFailure::TransientFetch(m) => WorkerError::TransientFetch(m.clone()),
            ScriptedFailure::ContentParse(m) => WorkerError::ContentParse(m.clone()),
            ScriptedFailure::Validation(m) => WorkerError::Validation(m.clone()),
        }
    }
}

// =============================================================================
// Mock Source Fetcher
// =============================================================================

pub struct MockFetcher {
    discover_responses: Mutex<VecDeque<Result<Vec<DiscoveredItem>, ScriptedFailure>>>,
    item_responses: Mutex<VecDeque<Result<String, ScriptedFailure>>>,
    discover_calls: Mutex<Vec<String>>,
    item_calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            discover_responses: Mutex::new(VecDeque::new()),
            item_responses: Mutex::new(VecDeque::new()),
            discover_calls: Mutex::new(Vec::new()),
            item_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a discovery response of (url, raw_payload) pairs.
    pub fn with_discovered(self, items: &[(&str, &str)]) -> Self {
        let items = items
            .iter()
            .map(|(url, payload)| DiscoveredItem {
                url: url.to_string(),
                raw_payload: payload.to_string(),
            })
            .collect();
        self.discover_responses.lock().unwrap().push_back(Ok(items));
        self
    }

    pub fn with_discover_failure(self, failure: ScriptedFailure) -> Self {
        self.discover_responses
            .lock()
            .unwrap()
            .push_back(Err(failure));
        self
    }

    pub fn with_item_content(self, content: &str) -> Self {
        self.item_responses
            .lock()
            .unwrap()
            .push_back(Ok(content.to_string()));
        self
    }

    pub fn with_item_failure(self, failure: ScriptedFailure) -> Self {
        self.item_responses.lock().unwrap().push_back(Err(failure));
        self
    }

    /// URLs passed to discover, in call order.
    pub fn discover_calls(&self) -> Vec<String> {
        self.discover_calls.lock().unwrap().clone()
    }

    /// URLs passed to fetch_item, in call order.
    pub fn item_calls(&self) -> Vec<String> {
        self.item_calls.lock().unwrap().clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSourceFetcher for MockFetcher {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>, WorkerError> {
        self.discover_calls
            .lock()
            .unwrap()
            .push(source.url.clone());

        match self.discover_responses.lock().unwrap().pop_front() {
            Some(Ok(items)) => Ok(items),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_item(&self, url: &str) -> Result<String, WorkerError> {
        self.item_calls.lock().unwrap().push(url.to_string());

        match self.item_responses.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(failure)) => Err(failure.to_error()),
            None => Ok(String::new()),
        }
    }
}

// =============================================================================
// Mock Item Processor
// =============================================================================

/// Processor whose default path extracts `title`/`body` from JSON payloads,
/// with optional scripted failures per method.
pub struct MockProcessor {
    analyze_failure: Option<ScriptedFailure>,
    extract_failure: Option<ScriptedFailure>,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self {
            analyze_failure: None,
            extract_failure: None,
        }
    }

    /// Fail every analyze call with the given failure.
    pub fn with_analyze_failure(mut self, failure: ScriptedFailure) -> Self {
        self.analyze_failure = Some(failure);
        self
    }

    /// Fail every extract call with the given failure.
    pub fn with_extract_failure(mut self, failure: ScriptedFailure) -> Self {
        self.extract_failure = Some(failure);
        self
    }
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseItemProcessor for MockProcessor {
    async fn analyze(&self, _item: &StagedItem) -> Result<Analysis, WorkerError> {
        if let Some(failure) = &self.analyze_failure {
            return Err(failure.to_error());
        }

        Ok(Analysis {
            content_kind: "mock".to_string(),
        })
    }

    async fn extract(
        &self,
        item: &StagedItem,
        content: &str,
    ) -> Result<serde_json::Value, WorkerError> {
        if let Some(failure) = &self.extract_failure {
            return Err(failure.to_error());
        }

        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| WorkerError::ContentParse(format!("mock content not JSON: {}", e)))?;

        Ok(serde_json::json!({
            "title": value.get("title").and_then(|t| t.as_str()).unwrap_or_default(),
            "body": value.get("body").and_then(|b| b.as_str()).unwrap_or_default(),
            "url": item.url,
        }))
    }
}

// =============================================================================
// Mock Enricher
// =============================================================================

pub struct MockEnricher {
    failure: Option<ScriptedFailure>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self { failure: None }
    }

    pub fn with_failure(mut self, failure: ScriptedFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

impl Default for MockEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEnricher for MockEnricher {
    async fn enrich(&self, extracted: &serde_json::Value) -> Result<Enrichment, WorkerError> {
        if let Some(failure) = &self.failure {
            return Err(failure.to_error());
        }

        let title = extracted
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("untitled")
            .to_string();
        let body = extracted
            .get("body")
            .and_then(|b| b.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Enrichment {
            title,
            body,
            metadata: serde_json::json!({"enriched_by": "mock"}),
        })
    }
}
