//! Default processor and enricher implementations.
//!
//! `JsonProcessor` expects staged payloads to be JSON objects carrying
//! `title`/`body` fields; `HeuristicEnricher` derives lightweight metadata
//! without any external service. Both sit behind the kernel trait seams so
//! richer implementations can replace them without touching the workers.

use async_trait::async_trait;

use super::traits::{Analysis, BaseEnricher, BaseItemProcessor, Enrichment};
use crate::domains::failures::WorkerError;
use crate::domains::staging::StagedItem;

pub struct JsonProcessor;

impl JsonProcessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseItemProcessor for JsonProcessor {
    async fn analyze(&self, item: &StagedItem) -> Result<Analysis, WorkerError> {
        let value: serde_json::Value = serde_json::from_str(&item.raw_payload)
            .map_err(|e| WorkerError::ContentParse(format!("payload is not JSON: {}", e)))?;

        let content_kind = if value.get("body").is_some() {
            "inline"
        } else {
            "reference"
        };

        Ok(Analysis {
            content_kind: content_kind.to_string(),
        })
    }

    async fn extract(
        &self,
        item: &StagedItem,
        content: &str,
    ) -> Result<serde_json::Value, WorkerError> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| WorkerError::ContentParse(format!("content is not JSON: {}", e)))?;

        let object = value.as_object().ok_or_else(|| {
            WorkerError::ContentParse("content is not a JSON object".to_string())
        })?;

        let title = object
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        let body = object
            .get("body")
            .and_then(|b| b.as_str())
            .unwrap_or_default();

        Ok(serde_json::json!({
            "title": title,
            "body": body,
            "url": item.url,
        }))
    }
}

pub struct HeuristicEnricher;

impl HeuristicEnricher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicEnricher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEnricher for HeuristicEnricher {
    async fn enrich(&self, extracted: &serde_json::Value) -> Result<Enrichment, WorkerError> {
        let title = extracted
            .get("title")
            .and_then(|t| t.as_str())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| WorkerError::Validation("extracted record has no title".to_string()))?
            .to_string();

        let body = extracted
            .get("body")
            .and_then(|b| b.as_str())
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| WorkerError::Validation("extracted record has no body".to_string()))?
            .to_string();

        let word_count = body.split_whitespace().count();
        let summary: String = body.chars().take(200).collect();

        Ok(Enrichment {
            title,
            body,
            metadata: serde_json::json!({
                "summary": summary,
                "word_count": word_count,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(payload: &str) -> StagedItem {
        StagedItem {
            id: uuid::Uuid::new_v4(),
            source_id: uuid::Uuid::new_v4(),
            url: "https://example.org/item/1".to_string(),
            raw_payload: payload.to_string(),
            extracted: None,
            status: Default::default(),
            retry_count: 0,
            processing_started_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn analyze_rejects_non_json_payload() {
        let processor = JsonProcessor::new();
        let err = processor
            .analyze(&sample_item("<html>nope</html>"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::ContentParse(_)));
    }

    #[tokio::test]
    async fn extract_pulls_title_and_body() {
        let processor = JsonProcessor::new();
        let item = sample_item(r#"{"title": "Hello", "body": "World"}"#);
        let extracted = processor.extract(&item, &item.raw_payload).await.unwrap();
        assert_eq!(extracted["title"], "Hello");
        assert_eq!(extracted["body"], "World");
    }

    #[tokio::test]
    async fn enricher_rejects_missing_title() {
        let enricher = HeuristicEnricher::new();
        let err = enricher
            .enrich(&serde_json::json!({"body": "text"}))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Validation(_)));
    }

    #[tokio::test]
    async fn enricher_builds_summary_metadata() {
        let enricher = HeuristicEnricher::new();
        let enrichment = enricher
            .enrich(&serde_json::json!({"title": "T", "body": "one two three"}))
            .await
            .unwrap();
        assert_eq!(enrichment.metadata["word_count"], 3);
        assert_eq!(enrichment.metadata["summary"], "one two three");
    }
}
