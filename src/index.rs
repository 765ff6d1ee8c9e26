//! Near-neighbor overlap lookup against a merged, sorted call list.

use crate::commands::merge_intervals;
use crate::interval::{SvInterval, MERGE_MIN_OVERLAP};
use std::cmp::Ordering;

/// A sorted list of clusters with no internal overlaps.
///
/// Because no two entries overlap, anything overlapping a query sits at most
/// one slot away from the query's insertion point, so only the predecessor
/// and successor need checking. The only way to build one is through the
/// merge engine, which guarantees that invariant.
#[derive(Debug, Clone, Default)]
pub struct NeighborIndex {
    intervals: Vec<SvInterval>,
}

impl NeighborIndex {
    /// Merge `intervals` and index the result.
    pub fn new(intervals: Vec<SvInterval>) -> Self {
        Self {
            intervals: merge_intervals(intervals),
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[SvInterval] {
        &self.intervals
    }

    /// Insertion point of `query` under the total order (leftmost on ties).
    #[inline]
    fn insertion_point(&self, query: &SvInterval) -> usize {
        self.intervals
            .partition_point(|interval| interval.position_cmp(query) == Ordering::Less)
    }

    /// True if `query` overlaps the entry just before or just after its
    /// insertion point by the given fractions.
    pub fn overlaps_any(
        &self,
        query: &SvInterval,
        min_fraction_self: f64,
        min_fraction_other: f64,
    ) -> bool {
        let idx = self.insertion_point(query);
        let hit = |interval: &SvInterval| {
            query.overlaps_with(
                interval,
                min_fraction_self,
                min_fraction_other,
                MERGE_MIN_OVERLAP,
                MERGE_MIN_OVERLAP,
            )
        };

        if idx > 0 && hit(&self.intervals[idx - 1]) {
            return true;
        }
        self.intervals.get(idx).is_some_and(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{SvSource, SvType, MERGE_MIN_FRACTION};

    fn call(chrom: &str, start: i64, end: i64) -> SvInterval {
        SvInterval::leaf(chrom, start, end, SvType::Del, end - start, SvSource::Pindel)
    }

    #[test]
    fn test_index_merges_input() {
        let index = NeighborIndex::new(vec![
            call("1", 500, 600),
            call("1", 100, 200),
            call("1", 150, 250),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.intervals()[0].end, 250);
    }

    #[test]
    fn test_overlaps_predecessor_and_successor() {
        let index = NeighborIndex::new(vec![call("1", 100, 200), call("1", 500, 600)]);

        // Sorts after [100,200], overlaps it.
        assert!(index.overlaps_any(&call("1", 150, 300), MERGE_MIN_FRACTION, MERGE_MIN_FRACTION));
        // Sorts before [500,600], overlaps it.
        assert!(index.overlaps_any(&call("1", 450, 520), MERGE_MIN_FRACTION, MERGE_MIN_FRACTION));
        // Falls in the gap.
        assert!(!index.overlaps_any(&call("1", 300, 400), MERGE_MIN_FRACTION, MERGE_MIN_FRACTION));
        // Wrong chromosome.
        assert!(!index.overlaps_any(&call("2", 100, 200), MERGE_MIN_FRACTION, MERGE_MIN_FRACTION));
    }

    #[test]
    fn test_overlaps_with_fraction() {
        let index = NeighborIndex::new(vec![call("1", 100, 200)]);
        assert!(index.overlaps_any(&call("1", 150, 250), 0.5, 0.5));
        assert!(!index.overlaps_any(&call("1", 150, 250), 0.6, 0.6));
    }

    #[test]
    fn test_empty_index() {
        let index = NeighborIndex::default();
        assert!(index.is_empty());
        assert!(!index.overlaps_any(&call("1", 100, 200), 0.5, 0.5));
    }
}
