//! Merge engine: clusters overlapping or adjacent SV calls.
//!
//! Uses O(n log n) sort + O(n) single-pass sweep against the running cluster.

use crate::interval::{SvInterval, ADJACENCY_GAP};

/// Cluster `intervals` into a sorted list of non-overlapping intervals.
///
/// Each call is moved into exactly one output entry. An entry that absorbed
/// nothing is returned unchanged; otherwise it is a cluster owning its
/// members. Input order does not matter.
pub fn merge_intervals(mut intervals: Vec<SvInterval>) -> Vec<SvInterval> {
    intervals.sort_by(SvInterval::position_cmp);

    let mut iter = intervals.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    for next in iter {
        if current.overlaps(&next) || current.is_adjacent(&next, ADJACENCY_GAP) {
            current = current.into_merged(next);
        } else {
            merged.push(std::mem::replace(&mut current, next));
        }
    }
    merged.push(current);

    // Wiggle padding can move a cluster's start behind an earlier entry.
    merged.sort_by(SvInterval::position_cmp);
    merged
}
