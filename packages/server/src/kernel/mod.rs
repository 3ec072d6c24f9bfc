//! Kernel module - pipeline infrastructure and dependencies.

pub mod coordinator;
pub mod fetcher;
pub mod jobs;
pub mod processing;
pub mod reclaimer;
pub mod scheduler;
pub mod test_dependencies;
pub mod traits;
pub mod workers;

pub use coordinator::{CoordinationFilter, CoordinationOutcome, Coordinator};
pub use fetcher::HttpFetcher;
pub use processing::{HeuristicEnricher, JsonProcessor};
pub use reclaimer::Reclaimer;
pub use scheduler::{start_scheduler, PipelineDeps};
pub use traits::*;
