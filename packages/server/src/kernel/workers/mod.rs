//! Workers: claim units of work, execute domain logic, advance state.
//!
//! All three share the same execution shape: claim a bounded batch, run the
//! opaque domain logic per item with per-item error isolation, report the
//! outcome through the queue contracts, and repeat until a claim comes back
//! empty. External drivers re-invoke `run_once` until drained.

pub mod enrich;
pub mod process;
pub mod scrape;

pub use enrich::{EnrichOutcome, EnrichmentWorker};
pub use process::{ProcessOptions, ProcessWorker};
pub use scrape::ScrapeWorker;
