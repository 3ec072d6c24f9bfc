//! Staging store: raw fetched payloads awaiting downstream processing.

pub mod staged_item;

pub use staged_item::{StagedItem, StagedItemStatus};
