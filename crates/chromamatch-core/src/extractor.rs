//! Adapter around the external fingerprint extractor (`fpcalc`)
//!
//! Audio decoding and fingerprint extraction happen out of process. This
//! module only runs the tool, parses what it prints, and turns every failure
//! into an [`ExtractionError`] before any frames reach the engine.

use crate::config::ExtractorConfig;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;

/// Failures of the external extractor
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("audio file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error talking to extractor: {0}")]
    Io(#[from] std::io::Error),

    #[error("extractor exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("unreadable extractor output: {0}")]
    InvalidOutput(String),

    #[error("extractor produced an empty fingerprint")]
    EmptyFingerprint,
}

/// Raw frames plus the duration reported by the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFingerprint {
    pub duration_s: f64,
    pub codes: Vec<u32>,
}

impl ExtractedFingerprint {
    /// Compact token for transport or storage
    pub fn encode(&self, algorithm: u8) -> crate::error::Result<String> {
        crate::codec::encode_with_algorithm(&self.codes, algorithm)
    }
}

#[derive(Deserialize)]
struct FpcalcJson {
    #[serde(default)]
    duration: f64,
    fingerprint: Vec<i64>,
}

/// Frames from a raw fingerprint value list. Older extractor builds print
/// frames as signed 32-bit integers, so negative values are reinterpreted.
fn frames_from_values(values: &[i64]) -> Result<Vec<u32>, ExtractionError> {
    values
        .iter()
        .map(|&v| {
            if v < i32::MIN as i64 || v > u32::MAX as i64 {
                Err(ExtractionError::InvalidOutput(format!(
                    "frame value {} out of 32-bit range",
                    v
                )))
            } else {
                Ok(v as u32)
            }
        })
        .collect()
}

/// Parse `fpcalc -raw -json` output
pub fn parse_fpcalc_json(text: &str) -> Result<ExtractedFingerprint, ExtractionError> {
    let parsed: FpcalcJson =
        serde_json::from_str(text).map_err(|e| ExtractionError::InvalidOutput(e.to_string()))?;
    let codes = frames_from_values(&parsed.fingerprint)?;
    if codes.is_empty() {
        return Err(ExtractionError::EmptyFingerprint);
    }
    Ok(ExtractedFingerprint {
        duration_s: parsed.duration,
        codes,
    })
}

/// Parse `fpcalc -raw` plain text output (`DURATION=` / `FINGERPRINT=` lines)
pub fn parse_fpcalc_text(text: &str) -> Result<ExtractedFingerprint, ExtractionError> {
    let mut duration_s = 0.0;
    let mut values = None;

    for line in text.lines() {
        if let Some(value) = line.trim().strip_prefix("DURATION=") {
            duration_s = value
                .trim()
                .parse()
                .map_err(|_| ExtractionError::InvalidOutput(format!("bad duration: {}", value)))?;
        } else if let Some(value) = line.trim().strip_prefix("FINGERPRINT=") {
            let parsed: Result<Vec<i64>, _> = value
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<i64>())
                .collect();
            values = Some(parsed.map_err(|e| ExtractionError::InvalidOutput(e.to_string()))?);
        }
    }

    let values =
        values.ok_or_else(|| ExtractionError::InvalidOutput("no FINGERPRINT line".to_string()))?;
    let codes = frames_from_values(&values)?;
    if codes.is_empty() {
        return Err(ExtractionError::EmptyFingerprint);
    }
    Ok(ExtractedFingerprint { duration_s, codes })
}

/// Runs `fpcalc` and collects raw frames
#[derive(Debug, Clone)]
pub struct FpcalcExtractor {
    binary: String,
    max_length_s: u32,
    algorithm: u8,
}

impl FpcalcExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            max_length_s: config.max_length_s,
            algorithm: config.algorithm,
        }
    }

    pub fn algorithm(&self) -> u8 {
        self.algorithm
    }

    fn command(&self, input: &std::ffi::OsStr) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-raw")
            .arg("-json")
            .arg("-length")
            .arg(self.max_length_s.to_string())
            .arg("-algorithm")
            .arg(self.algorithm.to_string())
            .arg(input);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> ExtractionError {
        ExtractionError::Spawn {
            binary: self.binary.clone(),
            source,
        }
    }

    /// Fingerprint an audio file on disk
    pub fn extract_file(&self, path: &Path) -> Result<ExtractedFingerprint, ExtractionError> {
        if !path.is_file() {
            return Err(ExtractionError::NotFound(path.to_path_buf()));
        }

        log::info!("Extracting fingerprint: {}", path.display());
        let output = self
            .command(path.as_os_str())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        Self::parse_output(output)
    }

    /// Fingerprint in-memory audio, streamed to the extractor's stdin
    pub fn extract_bytes(&self, audio: &[u8]) -> Result<ExtractedFingerprint, ExtractionError> {
        log::info!("Extracting fingerprint from {} bytes of audio", audio.len());
        let mut child = self
            .command(std::ffi::OsStr::new("-"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractionError::InvalidOutput("extractor stdin unavailable".into()))?;

        // stdout is drained while stdin is written, or a large input deadlocks
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(audio));
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output?;

        match written {
            Ok(Ok(())) => {}
            // the tool may stop reading early; its exit status tells the story
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(ExtractionError::InvalidOutput(
                    "stdin writer panicked".to_string(),
                ))
            }
        }

        Self::parse_output(output)
    }

    fn parse_output(output: Output) -> Result<ExtractedFingerprint, ExtractionError> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::warn!("Extractor failed ({}): {}", output.status, stderr);
            return Err(ExtractionError::ToolFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let extracted = parse_fpcalc_json(&stdout)?;
        log::info!(
            "Extracted {} frames ({:.1}s of audio)",
            extracted.codes.len(),
            extracted.duration_s
        );
        Ok(extracted)
    }
}

impl Default for FpcalcExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}
