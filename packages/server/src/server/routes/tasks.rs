//! Trigger endpoints for the Coordinator, the workers, and the Reclaimer.
//!
//! Every response carries a `success` flag. Poll-until-drained callers must
//! treat a non-success response as a stop signal, not as license to retry
//! indefinitely.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kernel::coordinator::{CoordinationFilter, Coordinator};
use crate::kernel::reclaimer::Reclaimer;
use crate::kernel::workers::{EnrichOutcome, EnrichmentWorker, ProcessOptions, ProcessWorker, ScrapeWorker};
use crate::server::app::AppState;

const EMPTY_QUEUE_MESSAGE: &str = "queue is empty";

// =============================================================================
// Coordinator trigger
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinateRequest {
    pub source_ids: Option<Vec<Uuid>>,
    pub force: bool,
    pub limit: Option<i64>,
    /// Run the scrape worker synchronously after enqueueing
    pub run_worker: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateResponse {
    pub success: bool,
    pub jobs_created: usize,
    pub sources: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn coordinate_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<CoordinateRequest>,
) -> (StatusCode, Json<CoordinateResponse>) {
    let coordinator = Coordinator::new(state.db_pool.clone(), state.config.pipeline.clone());
    let filter = CoordinationFilter {
        source_ids: req.source_ids,
        force: req.force,
        limit: req.limit,
    };

    let outcome = match coordinator.run(filter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "coordination trigger failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CoordinateResponse {
                    success: false,
                    jobs_created: 0,
                    sources: Vec::new(),
                    error: Some(e.to_string()),
                }),
            );
        }
    };

    if req.run_worker {
        let worker = ScrapeWorker::new(
            state.db_pool.clone(),
            state.deps.fetcher.clone(),
            state.config.pipeline.clone(),
        );
        if let Err(e) = worker.run_once().await {
            tracing::error!(error = %e, "synchronous scrape after coordination failed");
        }
    }

    (
        StatusCode::OK,
        Json(CoordinateResponse {
            success: true,
            jobs_created: outcome.jobs_created,
            sources: outcome.sources_targeted,
            error: None,
        }),
    )
}

// =============================================================================
// Worker triggers
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeRequest {}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessRequest {
    pub enable_deep_scraping: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResponse {
    pub success: bool,
    pub message: String,
    pub processed_count: usize,
}

fn worker_response(processed: usize, what: &str) -> (StatusCode, Json<WorkerResponse>) {
    let message = if processed == 0 {
        EMPTY_QUEUE_MESSAGE.to_string()
    } else {
        format!("processed {} {}", processed, what)
    };

    (
        StatusCode::OK,
        Json(WorkerResponse {
            success: true,
            message,
            processed_count: processed,
        }),
    )
}

fn worker_error(e: anyhow::Error, what: &str) -> (StatusCode, Json<WorkerResponse>) {
    tracing::error!(error = %e, "{} trigger failed", what);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(WorkerResponse {
            success: false,
            message: e.to_string(),
            processed_count: 0,
        }),
    )
}

pub async fn scrape_handler(
    Extension(state): Extension<AppState>,
    Json(_req): Json<ScrapeRequest>,
) -> (StatusCode, Json<WorkerResponse>) {
    let worker = ScrapeWorker::new(
        state.db_pool.clone(),
        state.deps.fetcher.clone(),
        state.config.pipeline.clone(),
    );

    match worker.run_once().await {
        Ok(processed) => worker_response(processed, "scrape jobs"),
        Err(e) => worker_error(e, "scrape"),
    }
}

pub async fn process_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<ProcessRequest>,
) -> (StatusCode, Json<WorkerResponse>) {
    let worker = ProcessWorker::new(
        state.db_pool.clone(),
        state.deps.processor.clone(),
        state.deps.fetcher.clone(),
        state.config.pipeline.clone(),
    );
    let opts = ProcessOptions {
        enable_deep_scraping: req.enable_deep_scraping,
    };

    match worker.run_once(&opts).await {
        Ok(processed) => worker_response(processed, "pipeline steps"),
        Err(e) => worker_error(e, "process"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    pub entry_id: Uuid,
}

pub async fn enrich_handler(
    Extension(state): Extension<AppState>,
    Json(req): Json<EnrichRequest>,
) -> (StatusCode, Json<WorkerResponse>) {
    let worker = EnrichmentWorker::new(
        state.db_pool.clone(),
        state.deps.enricher.clone(),
        state.config.pipeline.clone(),
    );

    match worker.handle_entry(req.entry_id).await {
        Ok(EnrichOutcome::Published(article_id)) => (
            StatusCode::OK,
            Json(WorkerResponse {
                success: true,
                message: format!("published article {}", article_id),
                processed_count: 1,
            }),
        ),
        Ok(EnrichOutcome::Duplicate) => (
            StatusCode::OK,
            Json(WorkerResponse {
                success: true,
                message: "duplicate content, entry indexed without publish".to_string(),
                processed_count: 1,
            }),
        ),
        Ok(EnrichOutcome::NotReady) => (
            StatusCode::OK,
            Json(WorkerResponse {
                success: true,
                message: "entry not awaiting enrichment".to_string(),
                processed_count: 0,
            }),
        ),
        Err(e) => worker_error(e, "enrich"),
    }
}

// =============================================================================
// Reclaimer trigger
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclaimResponse {
    pub success: bool,
    pub reclaimed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn reclaim_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<ReclaimResponse>) {
    let reclaimer = Reclaimer::new(state.db_pool.clone(), state.config.pipeline.clone());

    match reclaimer.reclaim_stuck().await {
        Ok(reclaimed) => (
            StatusCode::OK,
            Json(ReclaimResponse {
                success: true,
                reclaimed,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "reclaim trigger failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReclaimResponse {
                    success: false,
                    reclaimed: 0,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
