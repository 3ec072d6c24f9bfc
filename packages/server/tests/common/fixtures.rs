//! Shared fixtures for pipeline integration tests.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use driftwood_core::domains::sources::Source;
use driftwood_core::domains::staging::StagedItem;
use driftwood_core::domains::pipeline::PipelineEntry;
use driftwood_core::kernel::jobs::{JobQueue, ScrapeJob};

/// A source that is due for scraping right now.
pub async fn create_due_source(pool: &PgPool) -> Source {
    let id = Uuid::new_v4();
    Source::builder()
        .name(format!("source-{}", id))
        .url(format!("https://example.org/feed/{}", id))
        .build()
        .insert(pool)
        .await
        .expect("Failed to create source")
}

/// A source scheduled in the future.
pub async fn create_future_source(pool: &PgPool) -> Source {
    let id = Uuid::new_v4();
    Source::builder()
        .name(format!("source-{}", id))
        .url(format!("https://example.org/feed/{}", id))
        .next_scrape_at(Utc::now() + Duration::hours(6))
        .build()
        .insert(pool)
        .await
        .expect("Failed to create source")
}

/// A pending scrape job on its own fresh source.
pub async fn create_pending_job(pool: &PgPool) -> ScrapeJob {
    let source = create_due_source(pool).await;
    let queue = JobQueue::new(pool.clone());
    let result = queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .expect("Failed to enqueue job");
    ScrapeJob::find_by_id(pool, result.job_id())
        .await
        .expect("Failed to load job")
}

/// `n` pending jobs, each on its own source, with strictly increasing
/// creation times.
pub async fn create_pending_jobs(pool: &PgPool, n: usize) -> Vec<ScrapeJob> {
    let mut jobs = Vec::with_capacity(n);
    for offset in 0..n {
        let job = create_pending_job(pool).await;
        // Spread creation times so claim ordering is deterministic
        sqlx::query("UPDATE scrape_jobs SET created_at = NOW() - ($1 || ' seconds')::INTERVAL WHERE id = $2")
            .bind(((n - offset) * 60).to_string())
            .bind(job.id)
            .execute(pool)
            .await
            .expect("Failed to stagger job creation time");
        jobs.push(
            ScrapeJob::find_by_id(pool, job.id)
                .await
                .expect("Failed to reload job"),
        );
    }
    jobs
}

/// A staged item with its pipeline entry, on a fresh source.
pub async fn create_staged_item(pool: &PgPool, payload: &str) -> (StagedItem, PipelineEntry) {
    let source = create_due_source(pool).await;
    let url = format!("https://example.org/item/{}", Uuid::new_v4());
    StagedItem::create_with_entry(pool, source.id, &url, payload)
        .await
        .expect("Failed to stage item")
        .expect("Item unexpectedly deduplicated")
}

/// `n` staged items with entries, each on its own source.
pub async fn create_staged_items(pool: &PgPool, n: usize, payload: &str) -> Vec<StagedItem> {
    let mut items = Vec::with_capacity(n);
    for _ in 0..n {
        let (item, _) = create_staged_item(pool, payload).await;
        items.push(item);
    }
    items
}

/// Age a claimed job's started_at so it looks abandoned.
pub async fn backdate_job_claim(pool: &PgPool, job_id: Uuid, secs: i64) {
    sqlx::query(
        "UPDATE scrape_jobs SET started_at = NOW() - ($1 || ' seconds')::INTERVAL WHERE id = $2",
    )
    .bind(secs.to_string())
    .bind(job_id)
    .execute(pool)
    .await
    .expect("Failed to backdate job claim");
}

/// Age a claimed staged item's processing_started_at.
pub async fn backdate_item_claim(pool: &PgPool, item_id: Uuid, secs: i64) {
    sqlx::query(
        "UPDATE staged_items SET processing_started_at = NOW() - ($1 || ' seconds')::INTERVAL WHERE id = $2",
    )
    .bind(secs.to_string())
    .bind(item_id)
    .execute(pool)
    .await
    .expect("Failed to backdate item claim");
}

/// Set a job's attempt counter directly (fixture shortcut).
pub async fn set_job_attempts(pool: &PgPool, job_id: Uuid, attempts: i32) {
    sqlx::query("UPDATE scrape_jobs SET attempts = $1 WHERE id = $2")
        .bind(attempts)
        .bind(job_id)
        .execute(pool)
        .await
        .expect("Failed to set job attempts");
}

/// Set a staged item's retry counter directly (fixture shortcut).
pub async fn set_item_retries(pool: &PgPool, item_id: Uuid, retries: i32) {
    sqlx::query("UPDATE staged_items SET retry_count = $1 WHERE id = $2")
        .bind(retries)
        .bind(item_id)
        .execute(pool)
        .await
        .expect("Failed to set item retries");
}
