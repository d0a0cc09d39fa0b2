use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use readpile::genomics::io;
use readpile::pileup::{PileupWalker, NO_MINIMUM};
use readpile::PileupConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "readpile", about = "Read-backed pileups from aligned reads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print one pileup line per covered position of a window.
    Pileup {
        /// Aligned reads (BAM).
        bam: PathBuf,
        /// Contig to walk.
        #[arg(long)]
        contig: String,
        /// First position of the window (1-based, inclusive).
        #[arg(long)]
        start: u32,
        /// Last position of the window (1-based, inclusive).
        #[arg(long)]
        end: u32,
        /// Reference FASTA; a `.fai` index is built when missing.
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Minimum base quality.
        #[arg(long, default_value_t = NO_MINIMUM)]
        min_base_quality: i32,
        /// Minimum mapping quality.
        #[arg(long, default_value_t = NO_MINIMUM)]
        min_mapping_quality: i32,
        /// Downsample each position to this many reads.
        #[arg(long)]
        downsample: Option<usize>,
        /// Seed for downsampling.
        #[arg(long)]
        seed: Option<u64>,
        /// Keep both reads of overlapping pairs.
        #[arg(long)]
        no_overlap_filter: bool,
        /// Partition each pileup by sample.
        #[arg(long)]
        by_sample: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pileup {
            bam,
            contig,
            start,
            end,
            reference,
            min_base_quality,
            min_mapping_quality,
            downsample,
            seed,
            no_overlap_filter,
            by_sample,
        } => {
            let mut config = PileupConfig::default()
                .with_min_base_quality(min_base_quality)
                .with_min_mapping_quality(min_mapping_quality)
                .with_overlap_resolution(!no_overlap_filter)
                .with_by_sample(by_sample);
            config.downsample_to = downsample;
            config.seed = seed;
            run_pileup(&bam, &contig, start, end, reference.as_deref(), &config)?
        }
    }

    Ok(())
}

fn run_pileup(
    bam: &Path,
    contig: &str,
    start: u32,
    end: u32,
    reference_path: Option<&Path>,
    config: &PileupConfig,
) -> Result<()> {
    if start == 0 || end < start {
        bail!("invalid window {start}-{end}: positions are 1-based and start must not exceed end");
    }
    config.validate().context("invalid pileup configuration")?;

    let window = (start - 1)..end;
    let reference = reference_path
        .map(|path| io::fetch_reference(path, contig, window.clone()))
        .transpose()?;
    let reads = io::load_region(bam, contig, window.clone())?;
    let mut rng = config.rng();

    let mut emitted = 0usize;
    for pileup in PileupWalker::new(contig, window.clone(), &reads).by_sample(config.by_sample) {
        let filtered = config
            .apply(&pileup, &mut rng)
            .with_context(|| format!("failed to filter pileup at {}", pileup.location()))?;
        if filtered.is_empty() {
            continue;
        }
        let reference_base = reference
            .as_ref()
            .and_then(|seq| seq.get((pileup.location().position - window.start) as usize))
            .copied()
            .unwrap_or(b'N');
        println!("{}", filtered.pileup_string(reference_base));
        emitted += 1;
    }

    info!(contig, start, end, positions = emitted, "pileup complete");
    Ok(())
}
