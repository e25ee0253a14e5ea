//! Recognised fingerprint file kinds

use std::path::PathBuf;
use thiserror::Error;

/// Version written into fingerprint documents
pub const FORMAT_VERSION: &str = "1.0";

/// File extensions scanned when loading a directory
pub const FINGERPRINT_EXTENSIONS: [&str; 4] = ["json", "fp", "txt", "token"];

/// How a fingerprint was stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintFormat {
    /// [`FpJsonFile`](crate::FpJsonFile) document
    Document,
    /// `fpcalc -json` output, raw frame list or compressed token
    FpcalcJson,
    /// `fpcalc` plain text output with a `FINGERPRINT=` line
    FpcalcText,
    /// Bare encoded token
    Token,
}

impl FingerprintFormat {
    /// Guess the format from file content
    pub fn detect(content: &str) -> Result<Self, FormatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(FormatError::Empty);
        }

        if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed)
                .map_err(|e| FormatError::Unrecognized(format!("invalid JSON: {}", e)))?;
            return match (value.get("version"), value.get("metadata")) {
                (Some(_), Some(_)) => Ok(FingerprintFormat::Document),
                _ if value.get("fingerprint").is_some() => Ok(FingerprintFormat::FpcalcJson),
                _ => Err(FormatError::Unrecognized(
                    "JSON without a fingerprint field".to_string(),
                )),
            };
        }

        if trimmed.lines().any(|l| l.trim_start().starts_with("FINGERPRINT=")) {
            return Ok(FingerprintFormat::FpcalcText);
        }

        if trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Ok(FingerprintFormat::Token);
        }

        Err(FormatError::Unrecognized(
            "not a token, fpcalc output or fingerprint document".to_string(),
        ))
    }
}

/// Content that could not be classified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("fingerprint file is empty")]
    Empty,

    #[error("unrecognised fingerprint file: {0}")]
    Unrecognized(String),

    #[error("unsupported document version {0}")]
    UnsupportedVersion(String),
}

/// A fingerprint read from disk, whatever its format
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFingerprint {
    /// Identifier used in reports (file name)
    pub name: String,
    pub path: PathBuf,
    pub format: FingerprintFormat,
    /// Audio duration when the file records it
    pub duration_s: Option<f64>,
    pub codes: Vec<u32>,
}
