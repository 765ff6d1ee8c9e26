//! End-to-end consensus: read call tables, filter gaps, cluster, validate
//! and serialize.

use crate::calls::read_calls;
use crate::config::ConsensusConfig;
use crate::error::Result;
use crate::genome::{GapSet, ReferenceBuild};
use crate::interval::SvInterval;
use crate::output::{OutputFormat, ReferenceBases, SvWriter};
use crate::parallel::consolidate;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Where assembly gaps come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GapSource {
    /// No gap filtering.
    #[default]
    None,
    /// An explicit gap BED file.
    File(PathBuf),
    /// A directory of per-build gap files; the build is guessed from contigs.
    Directory(PathBuf),
}

/// Counts reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidateStats {
    pub calls_read: usize,
    pub calls_after_gaps: usize,
    pub clusters: usize,
    pub validated: usize,
    pub precise: usize,
    pub records_written: usize,
}

impl ConsolidateStats {
    fn count_clusters(&mut self, clusters: &[SvInterval]) {
        self.clusters = clusters.len();
        self.validated = clusters.iter().filter(|c| c.is_validated()).count();
        self.precise = clusters.iter().filter(|c| c.is_precise()).count();
    }
}

/// Consensus command configuration.
#[derive(Debug, Clone, Default)]
pub struct ConsolidateCommand {
    pub config: ConsensusConfig,
    pub format: OutputFormat,
    pub gaps: GapSource,
}

impl ConsolidateCommand {
    pub fn new(config: ConsensusConfig) -> Self {
        Self {
            config,
            format: OutputFormat::default(),
            gaps: GapSource::None,
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_gaps(mut self, gaps: GapSource) -> Self {
        self.gaps = gaps;
        self
    }

    /// Read every input table.
    pub fn read_inputs<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<Vec<SvInterval>> {
        let mut calls = Vec::new();
        for input in inputs {
            let file_calls = read_calls(input, self.config.default_wiggle)?;
            log::info!(
                "Read {} calls from {}",
                file_calls.len(),
                input.as_ref().display()
            );
            calls.extend(file_calls);
        }
        Ok(calls)
    }

    /// Load the configured gaps, or `None` when filtering is skipped.
    pub fn load_gaps(&self, calls: &[SvInterval]) -> Result<Option<GapSet>> {
        let path = match &self.gaps {
            GapSource::None => return Ok(None),
            GapSource::File(path) => path.clone(),
            GapSource::Directory(dir) => {
                let contigs: BTreeSet<&str> = calls.iter().map(|c| c.chrom.as_str()).collect();
                match ReferenceBuild::detect(contigs) {
                    Some(build) => {
                        log::info!("Detected {} contig naming", build.name());
                        build.gaps_file(dir)
                    }
                    None => return Ok(None),
                }
            }
        };
        log::info!("Loading gaps from {}", path.display());
        GapSet::from_file(path).map(Some)
    }

    /// Consolidate already-loaded calls into a sorted forest.
    pub fn consolidate(
        &self,
        calls: Vec<SvInterval>,
        stats: &mut ConsolidateStats,
    ) -> Result<Vec<SvInterval>> {
        self.config.validate()?;
        stats.calls_read = calls.len();

        let calls = match self.load_gaps(&calls)? {
            Some(gaps) => gaps.filter(calls),
            None => calls,
        };
        stats.calls_after_gaps = calls.len();

        let clusters = consolidate(calls, self.config.overlap_ratio);
        stats.count_clusters(&clusters);
        log::info!(
            "{} clusters, {} validated, {} precise",
            stats.clusters,
            stats.validated,
            stats.precise
        );
        Ok(clusters)
    }

    /// Run the full pipeline, writing records to `output`.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        inputs: &[P],
        reference: Option<&dyn ReferenceBases>,
        output: W,
    ) -> Result<ConsolidateStats> {
        let mut stats = ConsolidateStats::default();
        let calls = self.read_inputs(inputs)?;
        let clusters = self.consolidate(calls, &mut stats)?;

        let mut writer = SvWriter::new(output);
        stats.records_written =
            writer.write_all(self.format, &clusters, &self.config.sample, reference)?;
        log::debug!("Wrote {} {} records", stats.records_written, self.format);
        Ok(stats)
    }
}
