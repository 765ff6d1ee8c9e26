//! svmerge: consensus structural-variant calls from multiple callers
//!
//! This library clusters SV calls reported independently by several tools,
//! decides per cluster whether the tools corroborate each other, and picks
//! the authoritative coordinates.
//!
//! # Features
//!
//! - **Two-level cluster tree**: every raw call is owned by exactly one cluster
//! - **Priority validation**: deterministic tie-breaking by tool precision
//! - **Parallel processing**: chromosomes are consolidated independently with Rayon
//!
//! # Example
//!
//! ```rust
//! use svmerge::commands::{merge_intervals, normalize_all};
//! use svmerge::interval::{SvInterval, SvSource, SvType};
//!
//! let calls = vec![
//!     SvInterval::leaf("1", 100, 200, SvType::Del, 100, SvSource::Pindel),
//!     SvInterval::leaf("1", 105, 210, SvType::Del, 105, SvSource::BreakDancer),
//! ];
//!
//! let mut clusters = merge_intervals(calls);
//! normalize_all(&mut clusters, 0.5);
//!
//! assert!(clusters[0].is_validated());
//! assert_eq!((clusters[0].start, clusters[0].end), (100, 200));
//! ```

pub mod calls;
pub mod commands;
pub mod config;
pub mod error;
pub mod genome;
pub mod index;
pub mod interval;
pub mod output;
pub mod parallel;
pub mod reference;

// Re-export commonly used types
pub use calls::{read_calls, CallReader};
pub use config::ConsensusConfig;
pub use error::{Result, SvError};
pub use index::NeighborIndex;
pub use interval::{SourceSet, SvInterval, SvSource, SvType};
pub use reference::IndexedFasta;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calls::{read_calls, CallReader};
    pub use crate::commands::{merge_intervals, ConsolidateCommand};
    pub use crate::config::ConsensusConfig;
    pub use crate::interval::{SourceSet, SvInterval, SvSource, SvType};
    pub use crate::output::{OutputFormat, SvWriter};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::calls::parse_calls;
        use crate::parallel::consolidate;

        let content = "1\t100\t200\tDEL\t100\tPindel\n\
                       1\t105\t210\tDEL\t105\tBreakDancer\n\
                       1\t500\t600\tDEL\t100\tBreakSeq\n";
        let calls = parse_calls(content).unwrap();

        let clusters = consolidate(calls, 0.5);

        assert_eq!(clusters.len(), 2);
        assert!(clusters[0].is_validated());
        assert_eq!(clusters[0].end, 200);
        assert!(!clusters[1].is_validated());
    }
}
