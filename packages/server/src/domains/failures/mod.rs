//! Failure log and worker error taxonomy.

pub mod error;
pub mod failure;

pub use error::WorkerError;
pub use failure::{FailureKind, FailureLogEntry, WorkItemKind};
