//! Typed error taxonomy for worker domain logic.

use super::failure::FailureKind;

/// Error returned by the fetch/process/enrich trait seams.
///
/// The first three variants classify content-level outcomes and map onto the
/// persisted [`FailureKind`]. `Infra` wraps store/environment failures: it is
/// never charged against an item's retry budget and aborts the whole worker
/// invocation instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    #[error("content parse error: {0}")]
    ContentParse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Infra(#[from] anyhow::Error),
}

impl WorkerError {
    /// Whether this failure may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkerError::TransientFetch(_) | WorkerError::ContentParse(_)
        )
    }

    /// Persisted classification. `None` for infrastructure errors, which are
    /// propagated to the caller rather than logged against the item.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            WorkerError::TransientFetch(_) => Some(FailureKind::TransientFetch),
            WorkerError::ContentParse(_) => Some(FailureKind::ContentParse),
            WorkerError::Validation(_) => Some(FailureKind::Validation),
            WorkerError::Infra(_) => None,
        }
    }
}

impl From<sqlx::Error> for WorkerError {
    fn from(e: sqlx::Error) -> Self {
        WorkerError::Infra(e.into())
    }
}
