//! Scrape job queue: durable queue of per-source scrape jobs.

pub mod job;
pub mod queue;

pub use job::{JobStatus, ScrapeJob};
pub use queue::{EnqueueResult, JobQueue};
