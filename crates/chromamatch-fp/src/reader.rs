//! Fingerprint file reader

use crate::format::{FingerprintFormat, LoadedFingerprint, FINGERPRINT_EXTENSIONS};
use crate::json_format::FpJsonFile;
use anyhow::{Context, Result};
use chromamatch_core::{codec, extractor};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// `fpcalc -json` output, with either raw frames or a compressed token
#[derive(Deserialize)]
struct FpcalcDocument {
    #[serde(default)]
    duration: Option<f64>,
    fingerprint: serde_json::Value,
}

pub struct FpReader;

/// Read a fingerprint file of any supported format
pub fn read_fingerprint(path: &Path) -> Result<LoadedFingerprint> {
    FpReader::read(path)
}

impl FpReader {
    pub fn read(path: &Path) -> Result<LoadedFingerprint> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open fingerprint file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::parse(&name, path, &content)
            .with_context(|| format!("Invalid fingerprint file: {}", path.display()))
    }

    /// Parse already-loaded file content
    pub fn parse(name: &str, path: &Path, content: &str) -> Result<LoadedFingerprint> {
        let format = FingerprintFormat::detect(content)?;
        log::debug!("{}: detected {:?}", name, format);

        let (name, duration_s, codes) = match format {
            FingerprintFormat::Document => {
                let doc = FpJsonFile::from_json(content)?;
                let name = if doc.metadata.filename.is_empty() {
                    name.to_string()
                } else {
                    doc.metadata.filename.clone()
                };
                (name, Some(doc.metadata.duration_s), doc.codes()?)
            }
            FingerprintFormat::FpcalcJson => {
                let doc: FpcalcDocument = serde_json::from_str(content)?;
                match doc.fingerprint {
                    serde_json::Value::String(token) => {
                        (name.to_string(), doc.duration, codec::decode(&token)?)
                    }
                    _ => {
                        let extracted = extractor::parse_fpcalc_json(content)?;
                        (name.to_string(), doc.duration, extracted.codes)
                    }
                }
            }
            FingerprintFormat::FpcalcText => {
                let (duration_s, codes) = Self::parse_text(content)?;
                (name.to_string(), duration_s, codes)
            }
            FingerprintFormat::Token => (name.to_string(), None, codec::decode(content)?),
        };

        Ok(LoadedFingerprint {
            name,
            path: path.to_path_buf(),
            format,
            duration_s,
            codes,
        })
    }

    /// `FINGERPRINT=` holds either comma separated frames or a token
    fn parse_text(content: &str) -> Result<(Option<f64>, Vec<u32>)> {
        let value = content
            .lines()
            .find_map(|l| l.trim().strip_prefix("FINGERPRINT="))
            .unwrap_or_default()
            .trim();

        if value.contains(',') || value.parse::<i64>().is_ok() {
            let extracted = extractor::parse_fpcalc_text(content)?;
            return Ok((Some(extracted.duration_s), extracted.codes));
        }

        let duration_s = content
            .lines()
            .find_map(|l| l.trim().strip_prefix("DURATION="))
            .and_then(|d| d.trim().parse().ok());
        Ok((duration_s, codec::decode(value)?))
    }

    /// Fingerprint files directly inside `dir`, sorted by path
    pub fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|s| s.to_str())
                        .map(|ext| FINGERPRINT_EXTENSIONS.contains(&ext))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
