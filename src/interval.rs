//! Core SV interval types: single-caller leaf calls and consensus clusters.
//!
//! Coordinates are signed so that wiggle padding can extend a call past
//! position zero without wrapping.

use crate::error::SvError;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Opaque INFO passthrough. A `None` value is a flag-style key.
pub type InfoMap = BTreeMap<String, Option<String>>;

/// Structural variant type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SvType {
    Del,
    Ins,
    Dup,
    DupTandem,
    Inv,
    /// Anything the consensus logic does not validate or report.
    Other(String),
}

impl SvType {
    /// Types that take part in validation and output.
    #[inline]
    pub fn is_of_interest(&self) -> bool {
        !matches!(self, SvType::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            SvType::Del => "DEL",
            SvType::Ins => "INS",
            SvType::Dup => "DUP",
            SvType::DupTandem => "DUP:TANDEM",
            SvType::Inv => "INV",
            SvType::Other(name) => name,
        }
    }
}

impl FromStr for SvType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DEL" => SvType::Del,
            "INS" => SvType::Ins,
            "DUP" => SvType::Dup,
            "DUP:TANDEM" => SvType::DupTandem,
            "INV" => SvType::Inv,
            other => SvType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for SvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SV calling tools recognised by the consensus logic.
///
/// Declaration order is the validation priority: earlier tools are
/// considered more precise and win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SvSource {
    Pindel,
    BreakSeq,
    HaplotypeCaller,
    BreakDancer,
    CnvNator,
}

impl SvSource {
    /// All tools, most precise first.
    pub const PRIORITY: [SvSource; 5] = [
        SvSource::Pindel,
        SvSource::BreakSeq,
        SvSource::HaplotypeCaller,
        SvSource::BreakDancer,
        SvSource::CnvNator,
    ];

    /// Tools that report exact breakpoints.
    #[inline]
    pub fn is_precise(self) -> bool {
        matches!(
            self,
            SvSource::Pindel | SvSource::BreakSeq | SvSource::HaplotypeCaller
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SvSource::Pindel => "Pindel",
            SvSource::BreakSeq => "BreakSeq",
            SvSource::HaplotypeCaller => "HaplotypeCaller",
            SvSource::BreakDancer => "BreakDancer",
            SvSource::CnvNator => "CNVnator",
        }
    }

    /// Evidence class of the tool, as reported in SVMETHOD.
    pub fn method_code(self) -> &'static str {
        match self {
            SvSource::Pindel => "SR",
            SvSource::BreakSeq => "JM",
            SvSource::HaplotypeCaller => "AS",
            SvSource::BreakDancer => "RP",
            SvSource::CnvNator => "RD",
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl FromStr for SvSource {
    type Err = SvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SvSource::PRIORITY
            .into_iter()
            .find(|source| source.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SvError::UnknownSource(s.to_string()))
    }
}

impl fmt::Display for SvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of source tools, iterated in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceSet(u8);

impl SourceSet {
    #[inline]
    pub fn single(source: SvSource) -> Self {
        Self(source.bit())
    }

    #[inline]
    pub fn insert(&mut self, source: SvSource) {
        self.0 |= source.bit();
    }

    #[inline]
    pub fn union(self, other: SourceSet) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub fn contains(self, source: SvSource) -> bool {
        self.0 & source.bit() != 0
    }

    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = SvSource> {
        SvSource::PRIORITY
            .into_iter()
            .filter(move |source| self.contains(*source))
    }

    /// The sole member, if the set holds exactly one tool.
    pub fn only(self) -> Option<SvSource> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    /// Method codes of all members, sorted alphabetically.
    pub fn method_codes(self) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = self.iter().map(SvSource::method_code).collect();
        codes.sort_unstable();
        codes
    }
}

impl fmt::Display for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, source) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(source.name())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Provenance {
    /// A raw call from exactly one tool.
    Leaf(SvSource),
    /// A consensus cluster that owns the calls merged into it.
    Cluster {
        members: Vec<SvInterval>,
        sources: SourceSet,
        /// Index into `members`.
        validating: Option<usize>,
    },
}

/// One SV call or a cluster of merged calls.
#[derive(Debug, Clone, PartialEq)]
pub struct SvInterval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    /// SV length; independent of `end - start` for insertions.
    pub length: i64,
    pub name: String,
    pub sv_type: SvType,
    pub genotype: String,
    /// Slop applied to both ends during geometric tests.
    pub wiggle: i64,
    pub info: Option<InfoMap>,
    pub cipos: Option<(i64, i64)>,
    pub ciend: Option<(i64, i64)>,
    /// Caller-specific record, carried through untouched.
    pub native: Option<String>,
    pub(crate) is_precise: bool,
    pub(crate) is_validated: bool,
    pub(crate) provenance: Provenance,
}

impl SvInterval {
    /// Create a leaf call reported by a single tool.
    pub fn leaf(
        chrom: impl Into<String>,
        start: i64,
        end: i64,
        sv_type: SvType,
        length: i64,
        source: SvSource,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            length,
            name: source.name().to_string(),
            sv_type,
            genotype: "./1".to_string(),
            wiggle: 0,
            info: None,
            cipos: None,
            ciend: None,
            native: None,
            is_precise: false,
            is_validated: false,
            provenance: Provenance::Leaf(source),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_genotype(mut self, genotype: impl Into<String>) -> Self {
        self.genotype = genotype.into();
        self
    }

    pub fn with_wiggle(mut self, wiggle: i64) -> Self {
        self.wiggle = wiggle;
        self
    }

    pub fn with_info(mut self, info: InfoMap) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_native(mut self, native: impl Into<String>) -> Self {
        self.native = Some(native.into());
        self
    }

    /// Build a two-member cluster. Bounds are padded by each member's wiggle;
    /// type and genotype come from `first`.
    fn cluster(first: SvInterval, second: SvInterval) -> Self {
        debug_assert_eq!(first.chrom, second.chrom, "cross-chromosome merge");
        let sources = first.sources().union(second.sources());
        Self {
            chrom: first.chrom.clone(),
            start: (first.start - first.wiggle).min(second.start - second.wiggle),
            end: (first.end + first.wiggle).max(second.end + second.wiggle),
            length: first.length.max(second.length),
            name: format!("{},{}", first.name, second.name),
            sv_type: first.sv_type.clone(),
            genotype: first.genotype.clone(),
            wiggle: 0,
            info: None,
            cipos: None,
            ciend: None,
            native: None,
            is_precise: false,
            is_validated: false,
            provenance: Provenance::Cluster {
                members: vec![first, second],
                sources,
                validating: None,
            },
        }
    }

    /// Fold `next` into this interval.
    ///
    /// A leaf becomes a new two-member cluster; a cluster widens in place
    /// and takes ownership of `next`, so the tree stays two levels deep.
    pub(crate) fn into_merged(mut self, next: SvInterval) -> SvInterval {
        if self.is_leaf() {
            return SvInterval::cluster(self, next);
        }

        debug_assert_eq!(self.chrom, next.chrom, "cross-chromosome merge");
        self.start = self.start.min(next.start - next.wiggle);
        self.end = self.end.max(next.end + next.wiggle);
        self.length = self.length.max(next.length);
        self.name.push(',');
        self.name.push_str(&next.name);
        if let Provenance::Cluster {
            members, sources, ..
        } = &mut self.provenance
        {
            *sources = sources.union(next.sources());
            members.push(next);
        }
        self
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.provenance, Provenance::Leaf(_))
    }

    /// The reporting tool of a leaf call.
    #[inline]
    pub fn source(&self) -> Option<SvSource> {
        match self.provenance {
            Provenance::Leaf(source) => Some(source),
            Provenance::Cluster { .. } => None,
        }
    }

    /// All tools that contributed to this interval. Never empty.
    #[inline]
    pub fn sources(&self) -> SourceSet {
        match &self.provenance {
            Provenance::Leaf(source) => SourceSet::single(*source),
            Provenance::Cluster { sources, .. } => *sources,
        }
    }

    /// Direct members of a cluster; empty for a leaf.
    #[inline]
    pub fn members(&self) -> &[SvInterval] {
        match &self.provenance {
            Provenance::Leaf(_) => &[],
            Provenance::Cluster { members, .. } => members,
        }
    }

    #[inline]
    pub fn is_precise(&self) -> bool {
        self.is_precise
    }

    #[inline]
    pub fn is_validated(&self) -> bool {
        self.is_validated
    }

    /// The member whose call corroborated this cluster, if any.
    pub fn validating_interval(&self) -> Option<&SvInterval> {
        match &self.provenance {
            Provenance::Cluster {
                members,
                validating: Some(idx),
                ..
            } => members.get(*idx),
            _ => None,
        }
    }

    /// Leftmost start over all descendants.
    pub fn span_start(&self) -> i64 {
        match &self.provenance {
            Provenance::Leaf(_) => self.start,
            Provenance::Cluster { members, .. } => members
                .iter()
                .map(SvInterval::span_start)
                .min()
                .unwrap_or(self.start),
        }
    }

    /// Rightmost end over all descendants.
    pub fn span_end(&self) -> i64 {
        match &self.provenance {
            Provenance::Leaf(_) => self.end,
            Provenance::Cluster { members, .. } => members
                .iter()
                .map(SvInterval::span_end)
                .max()
                .unwrap_or(self.end),
        }
    }

    /// Total order used for every sort: chromosome name, then start, then end.
    #[inline]
    pub fn position_cmp(&self, other: &SvInterval) -> Ordering {
        self.chrom
            .cmp(&other.chrom)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }

    /// Wiggle-padded overlap test.
    ///
    /// The overlap must cover the larger of the two fractional requirements,
    /// and must also be at least `max(min_fraction_self, min_overlap_other)`.
    /// That second clause mixes a fraction with a length and ignores
    /// `_min_overlap_self`; callers depend on this exact behaviour.
    pub fn overlaps_with(
        &self,
        other: &SvInterval,
        min_fraction_self: f64,
        min_fraction_other: f64,
        _min_overlap_self: i64,
        min_overlap_other: i64,
    ) -> bool {
        if self.chrom != other.chrom {
            return false;
        }

        let lo = (self.start - self.wiggle).max(other.start - other.wiggle);
        let hi = (self.end + self.wiggle).min(other.end + other.wiggle);
        if lo >= hi {
            return false;
        }

        let self_len = (self.end - self.start + 2 * self.wiggle) as f64;
        let other_len = (other.end - other.start + 2 * other.wiggle) as f64;
        let overlap = (hi - lo) as f64;

        overlap >= (min_fraction_self * self_len).max(min_fraction_other * other_len)
            && overlap >= min_fraction_self.max(min_overlap_other as f64)
    }

    /// Overlap test with the thresholds used while clustering.
    #[inline]
    pub fn overlaps(&self, other: &SvInterval) -> bool {
        self.overlaps_with(
            other,
            MERGE_MIN_FRACTION,
            MERGE_MIN_FRACTION,
            MERGE_MIN_OVERLAP,
            MERGE_MIN_OVERLAP,
        )
    }

    /// Reciprocal-fraction overlap used during validation.
    #[inline]
    pub fn overlaps_reciprocal(&self, other: &SvInterval, ratio: f64) -> bool {
        self.overlaps_with(other, ratio, ratio, MERGE_MIN_OVERLAP, MERGE_MIN_OVERLAP)
    }

    /// True when either interval's end, shifted by `gap`, lands inside the
    /// other's `[start, end)`.
    pub fn is_adjacent(&self, other: &SvInterval, gap: i64) -> bool {
        if self.chrom != other.chrom {
            return false;
        }
        let self_end = self.end + gap;
        let other_end = other.end + gap;
        (self_end >= other.start && self_end < other.end)
            || (other_end >= self.start && other_end < self.end)
    }
}

impl fmt::Display for SvInterval {
    /// Leaves render as `chrom-start-end-length-sources`; clusters as the
    /// comma-joined renderings of their members.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provenance {
            Provenance::Leaf(source) => write!(
                f,
                "{}-{}-{}-{}-{}",
                self.chrom, self.start, self.end, self.length, source
            ),
            Provenance::Cluster { members, .. } => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
        }
    }
}

/// Minimum overlap fraction used while clustering.
pub const MERGE_MIN_FRACTION: f64 = 1e-9;
/// Minimum absolute overlap (bases) used while clustering.
pub const MERGE_MIN_OVERLAP: i64 = 1;
/// Gap allowed by the adjacency test while clustering.
pub const ADJACENCY_GAP: i64 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    fn call(start: i64, end: i64, source: SvSource) -> SvInterval {
        SvInterval::leaf("1", start, end, SvType::Del, end - start, source)
    }

    #[test]
    fn test_sv_type_parse() {
        assert_eq!("DEL".parse::<SvType>().unwrap(), SvType::Del);
        assert_eq!("DUP:TANDEM".parse::<SvType>().unwrap(), SvType::DupTandem);
        let other: SvType = "CTX".parse().unwrap();
        assert_eq!(other, SvType::Other("CTX".to_string()));
        assert!(!other.is_of_interest());
        assert_eq!(other.to_string(), "CTX");
    }

    #[test]
    fn test_source_parse_case_insensitive() {
        assert_eq!("cnvnator".parse::<SvSource>().unwrap(), SvSource::CnvNator);
        assert_eq!("Pindel".parse::<SvSource>().unwrap(), SvSource::Pindel);
        assert!(matches!(
            "Lumpy".parse::<SvSource>(),
            Err(SvError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_source_set_priority_order() {
        let mut set = SourceSet::single(SvSource::CnvNator);
        set.insert(SvSource::Pindel);
        set.insert(SvSource::BreakDancer);
        assert_eq!(set.len(), 3);
        assert_eq!(set.to_string(), "Pindel,BreakDancer,CNVnator");
        assert_eq!(set.method_codes(), vec!["RD", "RP", "SR"]);
        assert_eq!(set.only(), None);
        assert_eq!(
            SourceSet::single(SvSource::BreakSeq).only(),
            Some(SvSource::BreakSeq)
        );
    }

    #[test]
    fn test_ordering() {
        let mut calls = [
            SvInterval::leaf("2", 100, 200, SvType::Del, 100, SvSource::Pindel),
            SvInterval::leaf("10", 300, 400, SvType::Del, 100, SvSource::Pindel),
            SvInterval::leaf("10", 300, 350, SvType::Del, 50, SvSource::Pindel),
        ];
        calls.sort_by(SvInterval::position_cmp);

        // Lexicographic chromosome order, not numeric.
        assert_eq!(calls[0].chrom, "10");
        assert_eq!(calls[0].end, 350);
        assert_eq!(calls[1].end, 400);
        assert_eq!(calls[2].chrom, "2");
    }

    #[test]
    fn test_overlap_basic() {
        let a = call(100, 200, SvSource::Pindel);
        let b = call(150, 250, SvSource::BreakDancer);
        let c = call(200, 300, SvSource::BreakDancer);
        let mut d = call(100, 200, SvSource::BreakDancer);
        d.chrom = "2".to_string();

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_overlap_with_wiggle() {
        let a = call(100, 200, SvSource::Pindel);
        let b = call(210, 300, SvSource::BreakDancer).with_wiggle(20);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&call(210, 300, SvSource::BreakDancer)));
    }

    #[test]
    fn test_overlap_reciprocal_fraction() {
        let a = call(100, 200, SvSource::Pindel);
        let b = call(150, 250, SvSource::BreakDancer);
        assert!(a.overlaps_reciprocal(&b, 0.5));
        assert!(!a.overlaps_reciprocal(&b, 0.6));
    }

    #[test]
    fn test_overlap_symmetry() {
        let a = call(100, 200, SvSource::Pindel).with_wiggle(5);
        let b = call(150, 400, SvSource::BreakDancer);
        for (f, g) in [(0.1, 0.9), (0.5, 0.5), (0.3, 0.0), (1e-9, 1e-9)] {
            assert_eq!(
                a.overlaps_with(&b, f, g, 1, 1),
                b.overlaps_with(&a, g, f, 1, 1)
            );
        }
    }

    #[test]
    fn test_overlap_second_clause_quirk() {
        // The absolute-length clause reads min_fraction_self and
        // min_overlap_other only, so unequal length thresholds are not
        // symmetric.
        let a = call(100, 200, SvSource::Pindel);
        let b = call(150, 250, SvSource::BreakDancer);
        assert!(!a.overlaps_with(&b, 0.1, 0.1, 1, 60));
        assert!(b.overlaps_with(&a, 0.1, 0.1, 60, 1));
    }

    #[test]
    fn test_adjacency() {
        let a = call(100, 200, SvSource::Pindel);
        let b = call(200, 300, SvSource::BreakDancer);
        let c = call(201, 300, SvSource::BreakDancer);

        assert!(a.is_adjacent(&b, 0));
        assert!(b.is_adjacent(&a, 0));
        assert!(!a.is_adjacent(&c, 0));
        assert!(a.is_adjacent(&c, 1));
    }

    #[test]
    fn test_into_merged_builds_flat_cluster() {
        let a = call(100, 200, SvSource::Pindel);
        let b = call(150, 260, SvSource::BreakDancer).with_wiggle(10);
        let c = call(250, 300, SvSource::CnvNator);

        let merged = a.into_merged(b);
        assert!(!merged.is_leaf());
        assert_eq!(merged.start, 100);
        assert_eq!(merged.end, 270);
        assert_eq!(merged.members().len(), 2);

        let merged = merged.into_merged(c);
        assert_eq!(merged.members().len(), 3);
        assert!(merged.members().iter().all(SvInterval::is_leaf));
        assert_eq!(merged.end, 300);
        assert_eq!(merged.sources().len(), 3);
        assert_eq!(merged.name, "Pindel,BreakDancer,CNVnator");
        assert_eq!(merged.span_start(), 100);
        assert_eq!(merged.span_end(), 300);
    }

    #[test]
    fn test_display() {
        let a = call(100, 200, SvSource::Pindel);
        assert_eq!(a.to_string(), "1-100-200-100-Pindel");

        let merged = a.into_merged(call(150, 250, SvSource::BreakDancer));
        assert_eq!(
            merged.to_string(),
            "1-100-200-100-Pindel,1-150-250-100-BreakDancer"
        );
    }
}
