use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub pipeline: PipelineConfig,
}

/// Tuning knobs for the claim protocol, retry budgets, and reclaim policy.
///
/// Loaded once at startup and passed by value into the Coordinator, the
/// workers, and the Reclaimer. The core never reads the environment after
/// this point.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum rows a single claim call may take from either queue
    pub claim_batch_size: i64,
    /// Retry budget for scrape jobs
    pub job_max_attempts: i32,
    /// Retry ceiling for staged items
    pub staging_max_retries: i32,
    /// Age at which a `processing` row is considered abandoned
    pub stale_claim_secs: i64,
    /// Whether reclaim zeroes attempts/retry_count instead of preserving them
    pub reset_counters_on_reclaim: bool,
    /// Baseline scheduling interval for healthy sources
    pub base_scrape_interval_secs: i64,
    /// Cap on the failure-backoff multiplier (intervals, not seconds)
    pub max_backoff_intervals: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            claim_batch_size: 5,
            job_max_attempts: 3,
            staging_max_retries: 3,
            stale_claim_secs: 600,
            reset_counters_on_reclaim: false,
            base_scrape_interval_secs: 3600,
            max_backoff_intervals: 8,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            pipeline: PipelineConfig::from_env()?,
        })
    }
}

impl PipelineConfig {
    /// Load pipeline tuning from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            claim_batch_size: parse_var("CLAIM_BATCH_SIZE", defaults.claim_batch_size)?,
            job_max_attempts: parse_var("JOB_MAX_ATTEMPTS", defaults.job_max_attempts)?,
            staging_max_retries: parse_var("STAGING_MAX_RETRIES", defaults.staging_max_retries)?,
            stale_claim_secs: parse_var("STALE_CLAIM_SECS", defaults.stale_claim_secs)?,
            reset_counters_on_reclaim: parse_var(
                "RESET_COUNTERS_ON_RECLAIM",
                defaults.reset_counters_on_reclaim,
            )?,
            base_scrape_interval_secs: parse_var(
                "BASE_SCRAPE_INTERVAL_SECS",
                defaults.base_scrape_interval_secs,
            )?,
            max_backoff_intervals: parse_var(
                "MAX_BACKOFF_INTERVALS",
                defaults.max_backoff_intervals,
            )?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid value", name)),
        Err(_) => Ok(default),
    }
}
