//! Application setup and server configuration.

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::kernel::PipelineDeps;
use crate::server::routes::{
    coordinate_handler, enrich_handler, health_handler, process_handler, reclaim_handler,
    scrape_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub deps: PipelineDeps,
}

/// Build the axum application with all trigger routes.
///
/// External callers mutate pipeline state only through these routes; direct
/// status writes would break claim exclusivity.
pub fn build_app(pool: PgPool, config: Config, deps: PipelineDeps) -> Router {
    let state = AppState {
        db_pool: pool,
        config,
        deps,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/tasks/coordinate", post(coordinate_handler))
        .route("/tasks/scrape", post(scrape_handler))
        .route("/tasks/process", post(process_handler))
        .route("/tasks/enrich", post(enrich_handler))
        .route("/tasks/reclaim", post(reclaim_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
