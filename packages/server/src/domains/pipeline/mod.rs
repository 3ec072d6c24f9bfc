//! Pipeline stage tracker: ordered progression from discovery to index.

pub mod entry;
pub mod stage;

pub use entry::PipelineEntry;
pub use stage::{EnrichmentState, PipelineStage, StageError};
