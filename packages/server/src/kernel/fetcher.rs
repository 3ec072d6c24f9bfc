//! HTTP-backed source fetcher.
//!
//! Treats a source URL as a JSON feed endpoint: discovery fetches the feed
//! and yields one item per array element. Deep scraping fetches an item URL
//! and returns the response body verbatim.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::traits::{BaseSourceFetcher, DiscoveredItem};
use crate::domains::failures::WorkerError;
use crate::domains::sources::Source;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("driftwood/0.1")
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSourceFetcher for HttpFetcher {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>, WorkerError> {
        let response = self
            .client
            .get(&source.url)
            .send()
            .await
            .map_err(|e| WorkerError::TransientFetch(format!("{}: {}", source.url, e)))?;

        if !response.status().is_success() {
            return Err(WorkerError::TransientFetch(format!(
                "{}: HTTP {}",
                source.url,
                response.status()
            )));
        }

        let feed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WorkerError::ContentParse(format!("{}: {}", source.url, e)))?;

        let entries = feed.as_array().ok_or_else(|| {
            WorkerError::ContentParse(format!("{}: feed is not a JSON array", source.url))
        })?;

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = entry
                .get("url")
                .and_then(|u| u.as_str())
                .ok_or_else(|| {
                    WorkerError::ContentParse(format!("{}: feed entry missing url", source.url))
                })?
                .to_string();

            items.push(DiscoveredItem {
                url,
                raw_payload: entry.to_string(),
            });
        }

        tracing::debug!(
            source_id = %source.id,
            count = items.len(),
            "discovered items from feed"
        );

        Ok(items)
    }

    async fn fetch_item(&self, url: &str) -> Result<String, WorkerError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WorkerError::TransientFetch(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(WorkerError::TransientFetch(format!(
                "{}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| WorkerError::TransientFetch(format!("{}: {}", url, e)))
    }
}
