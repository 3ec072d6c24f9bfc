// Main entry point for the pipeline server

use std::sync::Arc;

use anyhow::{Context, Result};
use driftwood_core::kernel::{HeuristicEnricher, HttpFetcher, JsonProcessor, PipelineDeps};
use driftwood_core::server::build_app;
use driftwood_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,driftwood_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Driftwood content pipeline");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let deps = PipelineDeps {
        fetcher: Arc::new(HttpFetcher::new()),
        processor: Arc::new(JsonProcessor::new()),
        enricher: Arc::new(HeuristicEnricher::new()),
    };

    // Start scheduled tasks (coordination sweeps + reclaim)
    let _scheduler = driftwood_core::kernel::start_scheduler(
        pool.clone(),
        config.pipeline.clone(),
        deps.clone(),
    )
    .await
    .context("Failed to start scheduler")?;

    // Build application
    let app = build_app(pool, config.clone(), deps);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
