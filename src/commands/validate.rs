//! Per-cluster validation and coordinate normalization.
//!
//! A cluster is validated when a call from one tool is corroborated by the
//! cluster itself or by the precise calls merged into it, and more than one
//! tool contributed. Tools are tried in priority order; the first one that
//! qualifies becomes the authoritative call.

use crate::index::NeighborIndex;
use crate::interval::{Provenance, SvInterval, SvSource, SvType};

/// Default reciprocal overlap required of a validating call.
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.5;

/// Member indices grouped by reporting tool, indexed by `SvSource as usize`.
type MembersBySource = [Vec<usize>; SvSource::PRIORITY.len()];

fn members_by_source(members: &[SvInterval]) -> MembersBySource {
    let mut groups = MembersBySource::default();
    for (idx, member) in members.iter().enumerate() {
        // Nested clusters have no single reporting tool.
        if let Some(source) = member.source() {
            groups[source as usize].push(idx);
        }
    }
    groups
}

/// The lone call of `source`, if it reported exactly one.
#[inline]
fn sole_member(groups: &MembersBySource, source: SvSource) -> Option<usize> {
    match groups[source as usize].as_slice() {
        &[idx] => Some(idx),
        _ => None,
    }
}

impl SvInterval {
    /// Decide validation and precision for this interval and, when a precise
    /// tool validates it, snap its coordinates to that tool's call.
    pub fn normalize(&mut self, overlap_ratio: f64) {
        self.start = self.span_start();
        self.end = self.span_end();

        if !self.sv_type.is_of_interest() {
            return;
        }

        let members = match &self.provenance {
            Provenance::Leaf(source) => {
                // A lone call never validates itself.
                self.is_precise = source.is_precise();
                return;
            }
            Provenance::Cluster { members, .. } => members,
        };

        let groups = members_by_source(members);
        let precise = NeighborIndex::new(
            members
                .iter()
                .filter(|member| member.source().is_some_and(SvSource::is_precise))
                .cloned()
                .collect(),
        );

        let chosen = SvSource::PRIORITY.into_iter().find_map(|source| {
            let idx = sole_member(&groups, source)?;
            let candidate = &members[idx];
            let corroborated = self.overlaps_reciprocal(candidate, overlap_ratio)
                || precise.overlaps_any(candidate, overlap_ratio, overlap_ratio);
            corroborated.then_some((source, idx))
        });

        let Some((source, idx)) = chosen else {
            return;
        };

        let validated = self.sources().len() > 1;
        let precise_call = source.is_precise();
        let snapped = (validated && precise_call).then(|| {
            let call = &members[idx];
            (
                call.start,
                call.end,
                call.length,
                call.genotype.clone(),
                call.info.clone(),
            )
        });
        let fallback_length = SvSource::PRIORITY
            .into_iter()
            .filter_map(|source| sole_member(&groups, source))
            .map(|idx| members[idx].length)
            .find(|&length| length > 0);

        self.is_validated = validated;
        self.is_precise = precise_call;
        if let Provenance::Cluster { validating, .. } = &mut self.provenance {
            *validating = Some(idx);
        }

        if let Some((start, end, length, genotype, info)) = snapped {
            self.start = start;
            self.end = end;
            self.length = length;
            self.genotype = genotype;
            self.info = info;

            if self.length == 0 {
                if let Some(length) = fallback_length {
                    self.length = length;
                }
            }
        }
    }

    /// Collapse an insertion to its breakpoint.
    ///
    /// Imprecise insertions keep their start and record the original span as
    /// a one-sided CIEND window; precise ones move to the span midpoint.
    pub fn fix_pos(&mut self) {
        if self.sv_type != SvType::Ins {
            return;
        }

        if self.is_precise {
            let mid = (self.start + self.end).div_euclid(2);
            self.start = mid;
            self.end = mid;
            self.cipos = None;
            self.ciend = None;
        } else {
            let width = self.end - self.start;
            self.end = self.start;
            self.ciend = Some((0, width));
        }
    }
}

/// Normalize every interval in `intervals`.
pub fn normalize_all(intervals: &mut [SvInterval], overlap_ratio: f64) {
    for interval in intervals.iter_mut() {
        interval.normalize(overlap_ratio);
    }
}
