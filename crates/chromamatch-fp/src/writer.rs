//! Fingerprint file writer

use crate::json_format::FpJsonFile;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct FpWriter {}

impl FpWriter {
    pub fn new() -> Self {
        Self {}
    }

    /// Write a JSON fingerprint document
    pub fn write_document(&self, path: &Path, doc: &FpJsonFile) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create fingerprint file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, doc)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Write a bare encoded token
    pub fn write_token(&self, path: &Path, token: &str) -> Result<()> {
        std::fs::write(path, format!("{}\n", token))
            .with_context(|| format!("Failed to create fingerprint file: {}", path.display()))
    }

    /// `<output_dir>/<audio stem>.json`
    pub fn document_path(output_dir: &Path, audio_path: &Path) -> PathBuf {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fingerprint".to_string());
        output_dir.join(format!("{}.json", stem))
    }
}

impl Default for FpWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path() {
        assert_eq!(
            FpWriter::document_path(Path::new("/out"), Path::new("/music/song.mp3")),
            PathBuf::from("/out/song.json")
        );
        assert_eq!(
            FpWriter::document_path(Path::new("out"), Path::new("/")),
            PathBuf::from("out/fingerprint.json")
        );
    }
}
