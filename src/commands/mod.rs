//! Consensus operations: clustering, validation and the end-to-end pipeline.

pub mod consolidate;
pub mod merge;
pub mod validate;

pub use consolidate::{ConsolidateCommand, ConsolidateStats, GapSource};
pub use merge::merge_intervals;
pub use validate::{normalize_all, DEFAULT_OVERLAP_RATIO};
