//! Integration tests for the scrape worker, the enrichment worker, and the
//! full discovered-to-indexed dataflow.

mod common;

use std::sync::Arc;

use crate::common::TestHarness;
use driftwood_core::domains::articles::Article;
use driftwood_core::domains::failures::{FailureKind, FailureLogEntry};
use driftwood_core::domains::pipeline::{EnrichmentState, PipelineEntry, PipelineStage};
use driftwood_core::domains::sources::Source;
use driftwood_core::kernel::jobs::{JobQueue, JobStatus, ScrapeJob};
use driftwood_core::kernel::test_dependencies::{
    MockEnricher, MockFetcher, MockProcessor, ScriptedFailure,
};
use driftwood_core::kernel::workers::{
    EnrichOutcome, EnrichmentWorker, ProcessOptions, ProcessWorker, ScrapeWorker,
};
use test_context::test_context;

const ITEM_PAYLOAD: &str = r#"{"title": "Food drive Saturday", "body": "Donations at the park."}"#;

fn scrape_worker(ctx: &TestHarness, fetcher: MockFetcher) -> ScrapeWorker {
    ScrapeWorker::new(ctx.db_pool.clone(), Arc::new(fetcher), ctx.pipeline_config())
}

// =============================================================================
// Scrape worker
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn scrape_worker_stages_discovered_items(ctx: &TestHarness) {
    let source = common::create_due_source(&ctx.db_pool).await;
    let queue = JobQueue::new(ctx.db_pool.clone());
    let result = queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .unwrap();

    let fetcher = MockFetcher::new().with_discovered(&[
        ("https://example.org/a", ITEM_PAYLOAD),
        ("https://example.org/b", ITEM_PAYLOAD),
    ]);
    let worker = scrape_worker(ctx, fetcher);

    let processed = worker.run_once().await.unwrap();
    assert_eq!(processed, 1);

    let job = ScrapeJob::find_by_id(&ctx.db_pool, result.job_id())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let staged = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staged_items")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(staged, 2);

    let entries = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM pipeline_entries WHERE stage = 'discovered'",
    )
    .fetch_one(&ctx.db_pool)
    .await
    .unwrap();
    assert_eq!(entries, 2);

    let source = Source::find_by_id(&ctx.db_pool, source.id).await.unwrap();
    assert_eq!(source.consecutive_failures, 0);
    assert!(source.last_success_at.is_some());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn rediscovered_items_are_not_restaged(ctx: &TestHarness) {
    let source = common::create_due_source(&ctx.db_pool).await;
    let queue = JobQueue::new(ctx.db_pool.clone());

    queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .unwrap();
    let fetcher =
        MockFetcher::new().with_discovered(&[("https://example.org/a", ITEM_PAYLOAD)]);
    scrape_worker(ctx, fetcher).run_once().await.unwrap();

    // Second sweep rediscovers the same url
    queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .unwrap();
    let fetcher =
        MockFetcher::new().with_discovered(&[("https://example.org/a", ITEM_PAYLOAD)]);
    scrape_worker(ctx, fetcher).run_once().await.unwrap();

    let staged = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staged_items")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(staged, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn transient_discover_failure_retries_within_budget(ctx: &TestHarness) {
    let source = common::create_due_source(&ctx.db_pool).await;
    let queue = JobQueue::new(ctx.db_pool.clone());
    let result = queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .unwrap();

    // First poll fails, the retried claim in the same invocation succeeds
    let fetcher = MockFetcher::new()
        .with_discover_failure(ScriptedFailure::TransientFetch("connection reset".into()))
        .with_discovered(&[("https://example.org/a", ITEM_PAYLOAD)]);
    let worker = scrape_worker(ctx, fetcher);
    worker.run_once().await.unwrap();

    let job = ScrapeJob::find_by_id(&ctx.db_pool, result.job_id())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 1);

    let failures = FailureLogEntry::list_for_item(&ctx.db_pool, job.id)
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error_kind, FailureKind::TransientFetch);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn attempt_exhaustion_is_terminal_and_hits_source_health(ctx: &TestHarness) {
    let source = common::create_due_source(&ctx.db_pool).await;
    let queue = JobQueue::new(ctx.db_pool.clone());
    let result = queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .unwrap();

    let fetcher = MockFetcher::new()
        .with_discover_failure(ScriptedFailure::TransientFetch("down".into()))
        .with_discover_failure(ScriptedFailure::TransientFetch("down".into()))
        .with_discover_failure(ScriptedFailure::TransientFetch("down".into()));
    let worker = scrape_worker(ctx, fetcher);
    worker.run_once().await.unwrap();

    let job = ScrapeJob::find_by_id(&ctx.db_pool, result.job_id())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 3);

    let source = Source::find_by_id(&ctx.db_pool, source.id).await.unwrap();
    assert_eq!(source.consecutive_failures, 1);

    assert_eq!(
        FailureLogEntry::count_for_item(&ctx.db_pool, job.id)
            .await
            .unwrap(),
        3
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn empty_job_queue_returns_zero(ctx: &TestHarness) {
    let worker = scrape_worker(ctx, MockFetcher::new());
    assert_eq!(worker.run_once().await.unwrap(), 0);
}

// =============================================================================
// Enrichment worker + end-to-end
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn full_pipeline_publishes_an_article(ctx: &TestHarness) {
    let source = common::create_due_source(&ctx.db_pool).await;
    let queue = JobQueue::new(ctx.db_pool.clone());
    queue
        .enqueue_for_source(source.id, "scheduled", 3)
        .await
        .unwrap();

    let fetcher =
        MockFetcher::new().with_discovered(&[("https://example.org/a", ITEM_PAYLOAD)]);
    scrape_worker(ctx, fetcher).run_once().await.unwrap();

    ProcessWorker::new(
        ctx.db_pool.clone(),
        Arc::new(MockProcessor::new()),
        Arc::new(MockFetcher::new()),
        ctx.pipeline_config(),
    )
    .run_once(&ProcessOptions::default())
    .await
    .unwrap();

    let enricher = EnrichmentWorker::new(
        ctx.db_pool.clone(),
        Arc::new(MockEnricher::new()),
        ctx.pipeline_config(),
    );
    let enriched = enricher.run_once().await.unwrap();
    assert_eq!(enriched, 1);

    assert_eq!(Article::count(&ctx.db_pool).await.unwrap(), 1);

    let entry = sqlx::query_as::<_, PipelineEntry>("SELECT * FROM pipeline_entries")
        .fetch_one(&ctx.db_pool)
        .await
        .unwrap();
    assert_eq!(entry.stage, PipelineStage::Indexed);
    assert_eq!(entry.enrichment, EnrichmentState::ReadyToIndex);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn enrichment_redelivery_is_a_no_op(ctx: &TestHarness) {
    let (item, entry) = common::create_staged_item(&ctx.db_pool, ITEM_PAYLOAD).await;
    drive_to_awaiting_enrichment(ctx, &item.id).await;

    let worker = EnrichmentWorker::new(
        ctx.db_pool.clone(),
        Arc::new(MockEnricher::new()),
        ctx.pipeline_config(),
    );

    let first = worker.handle_entry(entry.id).await.unwrap();
    assert!(matches!(first, EnrichOutcome::Published(_)));

    let second = worker.handle_entry(entry.id).await.unwrap();
    assert_eq!(second, EnrichOutcome::NotReady);

    assert_eq!(Article::count(&ctx.db_pool).await.unwrap(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn duplicate_content_is_published_once(ctx: &TestHarness) {
    // Two different items carrying identical content
    let (item_a, entry_a) = common::create_staged_item(&ctx.db_pool, ITEM_PAYLOAD).await;
    let (item_b, entry_b) = common::create_staged_item(&ctx.db_pool, ITEM_PAYLOAD).await;
    drive_to_awaiting_enrichment(ctx, &item_a.id).await;
    drive_to_awaiting_enrichment(ctx, &item_b.id).await;

    let worker = EnrichmentWorker::new(
        ctx.db_pool.clone(),
        Arc::new(MockEnricher::new()),
        ctx.pipeline_config(),
    );

    let first = worker.handle_entry(entry_a.id).await.unwrap();
    assert!(matches!(first, EnrichOutcome::Published(_)));

    let second = worker.handle_entry(entry_b.id).await.unwrap();
    assert_eq!(second, EnrichOutcome::Duplicate);

    assert_eq!(Article::count(&ctx.db_pool).await.unwrap(), 1);

    // The duplicate's entry still retires at indexed
    let entry_b = PipelineEntry::find_by_id(&ctx.db_pool, entry_b.id)
        .await
        .unwrap();
    assert_eq!(entry_b.stage, PipelineStage::Indexed);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn enrichment_failure_is_logged_and_entry_stays_awaiting(ctx: &TestHarness) {
    let (item, entry) = common::create_staged_item(&ctx.db_pool, ITEM_PAYLOAD).await;
    drive_to_awaiting_enrichment(ctx, &item.id).await;

    let worker = EnrichmentWorker::new(
        ctx.db_pool.clone(),
        Arc::new(MockEnricher::new().with_failure(ScriptedFailure::Validation(
            "enrichment rejected".into(),
        ))),
        ctx.pipeline_config(),
    );

    let result = worker.handle_entry(entry.id).await;
    assert!(result.is_err());

    let entry = PipelineEntry::find_by_id(&ctx.db_pool, entry.id).await.unwrap();
    assert_eq!(entry.stage, PipelineStage::ReadyToPersist);
    assert_eq!(entry.enrichment, EnrichmentState::AwaitingEnrichment);

    let failures = FailureLogEntry::list_for_item(&ctx.db_pool, item.id)
        .await
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error_kind, FailureKind::Validation);

    assert_eq!(Article::count(&ctx.db_pool).await.unwrap(), 0);
}

/// Run the process worker until the item is done and awaiting enrichment.
async fn drive_to_awaiting_enrichment(ctx: &TestHarness, _item_id: &uuid::Uuid) {
    ProcessWorker::new(
        ctx.db_pool.clone(),
        Arc::new(MockProcessor::new()),
        Arc::new(MockFetcher::new()),
        ctx.pipeline_config(),
    )
    .run_once(&ProcessOptions::default())
    .await
    .unwrap();
}
