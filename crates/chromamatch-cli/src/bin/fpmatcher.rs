//! fpmatcher - Match a query fingerprint against a directory of fingerprints
//!
//! Usage: fpmatcher <query_fp> <db_dir> [--threshold <t>] [--min-score <s>]

use anyhow::Result;
use chromamatch_cli::init_logger;
use chromamatch_cli::output::print_json_results;
use chromamatch_cli::search::search;
use chromamatch_core::{ChromamatchConfig, Matcher};
use chromamatch_fp::{read_fingerprint, FpReader, LoadedFingerprint};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "fpmatcher")]
#[command(about = "Match fingerprints against a database", long_about = None)]
struct Args {
    /// Query fingerprint file
    query_fp: PathBuf,

    /// Database directory
    db_dir: PathBuf,

    /// Maximum mean bit error for a segment to count as a match
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Drop references whose best segment similarity (0-100) is lower
    #[arg(short, long, default_value_t = 0)]
    min_score: u32,

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

    run_fpmatcher(&args.query_fp, &args.db_dir, Matcher::new(config.matching), args.min_score)
}

fn run_fpmatcher(query_path: &Path, db_path: &Path, matcher: Matcher, min_score: u32) -> Result<()> {
    if !db_path.is_dir() {
        anyhow::bail!("Database directory not found: {}", db_path.display());
    }

    log::info!("Loading query: {}", query_path.display());
    let query = read_fingerprint(query_path)?;
    log::info!("Query has {} frames", query.codes.len());

    let fp_files = FpReader::list_dir(db_path)?;
    log::info!("Found {} fingerprint files, loading in parallel...", fp_files.len());

    let query_real = std::fs::canonicalize(query_path).unwrap_or_else(|_| query_path.to_path_buf());
    let load_start = std::time::Instant::now();
    let references: Vec<LoadedFingerprint> = fp_files
        .par_iter()
        .filter(|path| std::fs::canonicalize(path).map(|p| p != query_real).unwrap_or(true))
        .filter_map(|path| {
            log::debug!("Loading: {}", path.display());
            match FpReader::read(path) {
                Ok(fp) => Some(fp),
                Err(e) => {
                    log::warn!("Failed to load {}: {:#}", path.display(), e);
                    None
                }
            }
        })
        .collect();
    log::info!(
        "Loaded {} files in {:.2}s",
        references.len(),
        load_start.elapsed().as_secs_f64()
    );

    let match_start = std::time::Instant::now();
    let results = search(&matcher, &query, &references, min_score)?;

    log::info!(
        "Matching completed in {:.2}s, {} references matched",
        match_start.elapsed().as_secs_f64(),
        results.len()
    );

    print_json_results(&query_path.display().to_string(), results);
    Ok(())
}
