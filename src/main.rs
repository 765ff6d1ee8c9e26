// Clippy allows
#![allow(clippy::too_many_arguments)]

//! svmerge: consensus structural-variant calls
//!
//! Usage: svmerge <COMMAND> [OPTIONS]

use clap::{ArgAction, Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

use svmerge::commands::{ConsolidateCommand, GapSource};
use svmerge::config::ConsensusConfig;
use svmerge::error::SvError;
use svmerge::genome::ReferenceBuild;
use svmerge::output::{OutputFormat, ReferenceBases};
use svmerge::reference::IndexedFasta;

#[derive(Parser)]
#[command(name = "svmerge")]
#[command(version)]
#[command(about = "Consolidate structural-variant calls from multiple callers into a validated consensus set", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge and validate SV call tables
    Merge {
        /// Input call table (repeat for each caller)
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: vcf, bed or svp
        #[arg(short, long, default_value = "vcf")]
        format: OutputFormat,

        /// Sample name for VCF and SVP output
        #[arg(short, long, default_value = "SAMPLE")]
        sample: String,

        /// Reciprocal overlap required of a validating call
        #[arg(long, default_value = "0.5")]
        overlap_ratio: f64,

        /// Wiggle for calls whose row has none
        #[arg(short, long, default_value = "0")]
        wiggle: i64,

        /// Gap BED file; calls touching a gap are dropped
        #[arg(long, conflicts_with = "gaps_dir")]
        gaps: Option<PathBuf>,

        /// Directory with hg19.gaps.bed / b37.gaps.bed, chosen by contig naming
        #[arg(long)]
        gaps_dir: Option<PathBuf>,

        /// Reference FASTA for VCF REF bases (uses FASTA.fai when present)
        #[arg(short, long, value_name = "FASTA")]
        reference: Option<PathBuf>,
    },

    /// Report the reference build implied by the contigs of call tables
    Build {
        /// Input call table
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            log::warn!("Failed to initialize thread pool: {}", e);
        }
    }

    let result = match cli.command {
        Commands::Merge {
            input,
            output,
            format,
            sample,
            overlap_ratio,
            wiggle,
            gaps,
            gaps_dir,
            reference,
        } => run_merge(
            input,
            output,
            format,
            sample,
            overlap_ratio,
            wiggle,
            gaps,
            gaps_dir,
            reference,
        ),

        Commands::Build { input } => run_build(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_merge(
    input: Vec<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
    sample: String,
    overlap_ratio: f64,
    wiggle: i64,
    gaps: Option<PathBuf>,
    gaps_dir: Option<PathBuf>,
    reference: Option<PathBuf>,
) -> Result<(), SvError> {
    let config = ConsensusConfig::new()
        .with_overlap_ratio(overlap_ratio)
        .with_default_wiggle(wiggle)
        .with_sample(sample);
    config.validate()?;

    let gap_source = match (gaps, gaps_dir) {
        (Some(file), _) => GapSource::File(file),
        (None, Some(dir)) => GapSource::Directory(dir),
        (None, None) => GapSource::None,
    };

    let cmd = ConsolidateCommand::new(config)
        .with_format(format)
        .with_gaps(gap_source);

    let fasta = reference.map(IndexedFasta::open).transpose()?;
    let bases = fasta.as_ref().map(|f| f as &dyn ReferenceBases);

    let stats = match output {
        Some(path) => cmd.run(input.as_slice(), bases, File::create(path)?)?,
        None => {
            let stdout = io::stdout();
            let handle = stdout.lock();
            cmd.run(input.as_slice(), bases, handle)?
        }
    };

    log::info!(
        "Read {} calls, kept {} after gap filtering, wrote {} records",
        stats.calls_read,
        stats.calls_after_gaps,
        stats.records_written
    );
    Ok(())
}

fn run_build(input: Vec<PathBuf>) -> Result<(), SvError> {
    let calls = ConsolidateCommand::default().read_inputs(input.as_slice())?;
    let contigs: BTreeSet<&str> = calls.iter().map(|c| c.chrom.as_str()).collect();

    match ReferenceBuild::detect(contigs) {
        Some(build) => println!("{}", build.name()),
        None => println!("unknown"),
    }
    Ok(())
}
