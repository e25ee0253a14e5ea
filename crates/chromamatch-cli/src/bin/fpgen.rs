//! fpgen - Fingerprint generator
//!
//! Usage: fpgen <input_audio_path> [--output-dir <dir>] [--config <file>]
//!
//! Without an output directory the encoded fingerprint is printed on stdout.

use anyhow::{Context, Result};
use chromamatch_cli::init_logger;
use chromamatch_core::{ChromamatchConfig, FpcalcExtractor};
use chromamatch_fp::{FpJsonFile, FpWriter};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "fpgen")]
#[command(about = "Generate acoustic fingerprints from audio files", long_about = None)]
struct Args {
    /// Input audio file path
    input_audio_path: PathBuf,

    /// Write a JSON fingerprint document here instead of printing the token
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

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

    let config = match &args.config {
        Some(path) => ChromamatchConfig::load(path)?,
        None => ChromamatchConfig::default(),
    };

    run_fpgen(&args.input_audio_path, args.output_dir.as_deref(), &config)
}

fn run_fpgen(input_path: &Path, output_dir: Option<&Path>, config: &ChromamatchConfig) -> Result<()> {
    log::info!("Processing: {}", input_path.display());

    let extractor = FpcalcExtractor::new(&config.extractor);
    let start = std::time::Instant::now();
    let extracted = extractor
        .extract_file(input_path)
        .with_context(|| format!("Failed to fingerprint {}", input_path.display()))?;
    let elapsed = start.elapsed();

    log::info!(
        "Extracted {} frames ({:.1}s of audio) in {:.2}s",
        extracted.codes.len(),
        extracted.duration_s,
        elapsed.as_secs_f64()
    );

    let Some(output_dir) = output_dir else {
        println!("{}", extracted.encode(extractor.algorithm())?);
        return Ok(());
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let filename = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let doc = FpJsonFile::new(
        input_path.display().to_string(),
        filename,
        extracted.duration_s,
        &extracted.codes,
        extractor.algorithm(),
    )?;

    let output_path = FpWriter::document_path(output_dir, input_path);
    FpWriter::new().write_document(&output_path, &doc)?;

    let result = serde_json::json!({
        "status": "success",
        "input_file": input_path.display().to_string(),
        "output_file": output_path.display().to_string(),
        "num_frames": extracted.codes.len(),
        "duration_s": extracted.duration_s,
        "processing_time_seconds": elapsed.as_secs_f64(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
