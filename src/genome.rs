//! Reference build detection and assembly-gap filtering.
//!
//! Gap files are plain BED (`chrom\tstart\tend`). A gap directory holds one
//! file per supported build, named `<build>.gaps.bed`.
//!
//! Gaps keep BED's half-open reading `[start, end)`, while call bounds are
//! inclusive at both ends. A call therefore touches a gap when
//! `gap_start <= call_end && call_start < gap_end`; a call starting exactly
//! at a gap's BED end does not.

use crate::error::{Result, SvError};
use crate::interval::SvInterval;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Reference naming conventions with bundled gap annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceBuild {
    /// UCSC naming: `chr1`, `chrX`, `chrM`.
    Hg19,
    /// GRC naming: `1`, `X`, `MT`.
    B37,
}

impl ReferenceBuild {
    /// Guess the build from contig names. UCSC naming wins if both appear.
    pub fn detect<'a, I>(contigs: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut b37 = false;
        for contig in contigs {
            if let Some(rest) = contig.strip_prefix("chr") {
                if is_major_contig(rest, "M") {
                    return Some(ReferenceBuild::Hg19);
                }
            } else if is_major_contig(contig, "MT") {
                b37 = true;
            }
        }

        if b37 {
            Some(ReferenceBuild::B37)
        } else {
            log::warn!("Could not guess gaps file for reference. No gap filtering will be done.");
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReferenceBuild::Hg19 => "hg19",
            ReferenceBuild::B37 => "b37",
        }
    }

    /// Gap file for this build inside `dir`.
    pub fn gaps_file(self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.gaps.bed", self.name()))
    }
}

/// Autosomes 1-22, X, Y and the given mitochondrial name.
fn is_major_contig(name: &str, mito: &str) -> bool {
    match name {
        "X" | "Y" => true,
        _ if name == mito => true,
        _ => name
            .parse::<u8>()
            .is_ok_and(|n| (1..=22).contains(&n) && !name.starts_with('0')),
    }
}

/// Assembly gaps, sorted and merged per chromosome.
#[derive(Debug, Clone, Default)]
pub struct GapSet {
    gaps: FxHashMap<String, Vec<(i64, i64)>>,
}

impl GapSet {
    /// Load gaps from a BED file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let reader = BufReader::new(reader);
        let mut gaps: FxHashMap<String, Vec<(i64, i64)>> = FxHashMap::default();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(SvError::Parse {
                    line: line_num + 1,
                    message: "Gap file requires chrom, start and end columns".to_string(),
                });
            }

            let parse = |s: &str| {
                s.parse::<i64>().map_err(|_| SvError::Parse {
                    line: line_num + 1,
                    message: format!("Invalid gap position: {}", s),
                })
            };
            let start = parse(fields[1])?;
            let end = parse(fields[2])?;

            gaps.entry(fields[0].to_string())
                .or_default()
                .push((start, end));
        }

        for spans in gaps.values_mut() {
            spans.sort_unstable();
            spans.dedup_by(|next, prev| {
                if next.0 <= prev.1 {
                    prev.1 = prev.1.max(next.1);
                    true
                } else {
                    false
                }
            });
        }

        Ok(Self { gaps })
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    /// True if `[start, end]` touches any gap on `chrom`.
    pub fn overlaps(&self, chrom: &str, start: i64, end: i64) -> bool {
        let Some(spans) = self.gaps.get(chrom) else {
            return false;
        };
        // First gap whose half-open end lies past the query start.
        let idx = spans.partition_point(|&(_, gap_end)| gap_end <= start);
        spans.get(idx).is_some_and(|&(gap_start, _)| gap_start <= end)
    }

    /// Drop calls that touch a gap.
    pub fn filter(&self, calls: Vec<SvInterval>) -> Vec<SvInterval> {
        let before = calls.len();
        let kept: Vec<SvInterval> = calls
            .into_iter()
            .filter(|call| !self.overlaps(&call.chrom, call.start, call.end))
            .collect();
        log::info!("Removed {} calls overlapping assembly gaps", before - kept.len());
        kept
    }
}
