//! Per-chromosome consolidation using Rayon.
//!
//! Clusters never span chromosomes and validation only reads a snapshot
//! built from one cluster's own members, so chromosomes are independent.

use crate::commands::merge_intervals;
use crate::interval::SvInterval;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Minimum number of calls before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Group calls by chromosome for parallel processing.
pub fn group_by_chromosome(calls: Vec<SvInterval>) -> FxHashMap<String, Vec<SvInterval>> {
    let mut groups: FxHashMap<String, Vec<SvInterval>> = FxHashMap::default();

    for call in calls {
        groups.entry(call.chrom.clone()).or_default().push(call);
    }

    groups
}

/// Merge, normalize and fix insertion positions for one chromosome.
pub fn consolidate_chromosome(calls: Vec<SvInterval>, overlap_ratio: f64) -> Vec<SvInterval> {
    let mut clusters = merge_intervals(calls);
    for cluster in clusters.iter_mut() {
        cluster.normalize(overlap_ratio);
        cluster.fix_pos();
    }
    clusters
}

/// Run the full consensus over all chromosomes, returning a sorted forest.
pub fn consolidate(calls: Vec<SvInterval>, overlap_ratio: f64) -> Vec<SvInterval> {
    if calls.is_empty() {
        return Vec::new();
    }

    let parallel = calls.len() >= PARALLEL_THRESHOLD;
    let groups = group_by_chromosome(calls);

    let per_chrom: Vec<Vec<SvInterval>> = if parallel {
        groups
            .into_par_iter()
            .map(|(_, calls)| consolidate_chromosome(calls, overlap_ratio))
            .collect()
    } else {
        groups
            .into_values()
            .map(|calls| consolidate_chromosome(calls, overlap_ratio))
            .collect()
    };

    // Flatten and sort results
    let mut result: Vec<SvInterval> = per_chrom.into_iter().flatten().collect();
    result.sort_by(SvInterval::position_cmp);
    result
}
