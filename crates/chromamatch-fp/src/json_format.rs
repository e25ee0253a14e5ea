//! JSON fingerprint documents
//!
//! A document keeps the encoded fingerprint together with enough metadata
//! to identify the recording it came from.

use crate::format::{FormatError, FORMAT_VERSION};
use chromamatch_core::codec;
use serde::{Deserialize, Serialize};

/// Complete JSON fingerprint file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpJsonFile {
    pub version: String,
    pub metadata: FpJsonMetadata,
    /// Encoded fingerprint token
    pub fingerprint: String,
}

/// Metadata about the original audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpJsonMetadata {
    pub original_path: String,
    pub filename: String,
    /// Extractor algorithm id
    pub algorithm: u8,
    pub duration_s: f64,
    pub num_frames: usize,
    pub created_at: String,
}

impl FpJsonFile {
    /// Create a document from raw frames
    pub fn new(
        original_path: String,
        filename: String,
        duration_s: f64,
        codes: &[u32],
        algorithm: u8,
    ) -> chromamatch_core::error::Result<Self> {
        Ok(Self {
            version: FORMAT_VERSION.to_string(),
            metadata: FpJsonMetadata {
                original_path,
                filename,
                algorithm,
                duration_s,
                num_frames: codes.len(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
            fingerprint: codec::encode_with_algorithm(codes, algorithm)?,
        })
    }

    /// Save to JSON file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        Self::from_json(&json_str)
    }

    /// Parse and check the document version
    pub fn from_json(json_str: &str) -> anyhow::Result<Self> {
        let fp_file: FpJsonFile = serde_json::from_str(json_str)?;
        if fp_file.version.split('.').next() != FORMAT_VERSION.split('.').next() {
            return Err(FormatError::UnsupportedVersion(fp_file.version).into());
        }
        Ok(fp_file)
    }

    /// Decoded frames
    pub fn codes(&self) -> chromamatch_core::error::Result<Vec<u32>> {
        codec::decode(&self.fingerprint)
    }
}
