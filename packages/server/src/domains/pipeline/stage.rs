//! Ordered pipeline stages and the enrichment substate.
//!
//! Stages move forward one step at a time; the only way back is the explicit
//! reset path on [`super::PipelineEntry`]. Enrichment is tracked separately
//! because it is driven by events, not by the polling claim loop.

use serde::{Deserialize, Serialize};

/// Coarse pipeline stage. Order is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pipeline_stage", rename_all = "snake_case")]
pub enum PipelineStage {
    Discovered,
    Analyzing,
    AwaitingFetch,
    Extracted,
    ReadyToPersist,
    Indexed,
}

/// Enrichment substate, advanced by the event-driven enrichment worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "enrichment_state", rename_all = "snake_case")]
pub enum EnrichmentState {
    #[default]
    None,
    AwaitingEnrichment,
    ReadyToIndex,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StageError {
    #[error("illegal stage transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: PipelineStage,
        to: PipelineStage,
    },
    #[error("stage changed concurrently, expected {expected:?}")]
    ConcurrentChange { expected: PipelineStage },
    #[error("stage store error: {0}")]
    Store(String),
}

impl PipelineStage {
    /// The single stage that may follow this one, if any.
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Discovered => Some(PipelineStage::Analyzing),
            PipelineStage::Analyzing => Some(PipelineStage::AwaitingFetch),
            PipelineStage::AwaitingFetch => Some(PipelineStage::Extracted),
            PipelineStage::Extracted => Some(PipelineStage::ReadyToPersist),
            PipelineStage::ReadyToPersist => Some(PipelineStage::Indexed),
            PipelineStage::Indexed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    /// Check that `to` is the single legal successor of `self`.
    pub fn check_transition(&self, to: PipelineStage) -> Result<(), StageError> {
        if self.next() == Some(to) {
            Ok(())
        } else {
            Err(StageError::IllegalTransition { from: *self, to })
        }
    }
}
