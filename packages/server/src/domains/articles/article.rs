//! Article model - the finalized, published record.
//!
//! Deduplicated by content fingerprint: publishing the same content twice is
//! a no-op, enforced by the unique index rather than a read-then-write.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::content_fingerprint;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: Uuid,
    pub staged_item_id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub body: String,
    pub enrichment: serde_json::Value,
    pub content_fingerprint: String,
    pub published_at: DateTime<Utc>,
}

impl Article {
    /// Publish an enriched item.
    ///
    /// Returns `None` when an article with the same content fingerprint
    /// already exists.
    pub async fn publish(
        pool: &PgPool,
        staged_item_id: Uuid,
        source_id: Uuid,
        title: &str,
        body: &str,
        enrichment: &serde_json::Value,
    ) -> Result<Option<Self>> {
        let fingerprint = content_fingerprint(&format!("{}\n{}", title, body));

        let article = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO articles (
                id, staged_item_id, source_id, title, body, enrichment, content_fingerprint
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (content_fingerprint) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(staged_item_id)
        .bind(source_id)
        .bind(title)
        .bind(body)
        .bind(enrichment)
        .bind(&fingerprint)
        .fetch_optional(pool)
        .await
        .context("Failed to publish article")?;

        match &article {
            Some(article) => {
                tracing::info!(
                    article_id = %article.id,
                    source_id = %source_id,
                    "published article"
                );
            }
            None => {
                tracing::debug!(
                    staged_item_id = %staged_item_id,
                    fingerprint = %fingerprint,
                    "duplicate content, publish skipped"
                );
            }
        }

        Ok(article)
    }

    pub async fn find_by_staged_item(pool: &PgPool, staged_item_id: Uuid) -> Result<Option<Self>> {
        let article =
            sqlx::query_as::<_, Self>("SELECT * FROM articles WHERE staged_item_id = $1")
                .bind(staged_item_id)
                .fetch_optional(pool)
                .await
                .context("Failed to look up article for staged item")?;

        Ok(article)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
            .fetch_one(pool)
            .await
            .context("Failed to count articles")
    }
}
