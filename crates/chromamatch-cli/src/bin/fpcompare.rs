//! fpcompare - Compare two fingerprint files
//!
//! Usage: fpcompare <fp1> <fp2> [--threshold <t>] [--config <file>]

use anyhow::Result;
use chromamatch_cli::init_logger;
use chromamatch_cli::output::print_json;
use chromamatch_cli::search::compare_pair;
use chromamatch_core::{ChromamatchConfig, Matcher};
use chromamatch_fp::read_fingerprint;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fpcompare")]
#[command(about = "Compare two fingerprints and report matching segments", long_about = None)]
struct Args {
    /// First fingerprint file
    fp1: PathBuf,

    /// Second fingerprint file
    fp2: PathBuf,

    /// Maximum mean bit error for a segment to count as a match
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let mut config = match &args.config {
        Some(path) => ChromamatchConfig::load(path)?,
        None => ChromamatchConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.matching.match_threshold = threshold;
    }
    config.matching.validate()?;

    let fp1 = read_fingerprint(&args.fp1)?;
    let fp2 = read_fingerprint(&args.fp2)?;
    log::info!(
        "Comparing {} ({} frames) with {} ({} frames)",
        fp1.name,
        fp1.codes.len(),
        fp2.name,
        fp2.codes.len()
    );

    let matcher = Matcher::new(config.matching);
    print_json(&compare_pair(&matcher, &fp1, &fp2)?);
    Ok(())
}
