//! Source registry: external content sources with schedule and health counters.

pub mod source;

pub use source::Source;
