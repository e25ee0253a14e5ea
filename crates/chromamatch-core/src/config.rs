//! Configuration for matching and extraction
//!
//! Every field has a serde default so a TOML file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChromamatchConfig {
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl ChromamatchConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: ChromamatchConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.matching.validate()?;
        Ok(config)
    }
}

/// Segmentation and scoring parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchConfig {
    /// Segments whose mean bit error is at or above this are dropped
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// Neighbouring segments merge when their scores differ by less than this
    #[serde(default = "default_merge_score_tolerance")]
    pub merge_score_tolerance: f64,
    /// Minimum smoothed slope for a segment boundary
    #[serde(default = "default_gradient_threshold")]
    pub gradient_threshold: f64,
    #[serde(default = "default_filter_pass_count")]
    pub filter_pass_count: f64,
    #[serde(default = "default_filter_sigma")]
    pub filter_sigma: f64,
    /// Number of ranked alignments to segment
    #[serde(default = "default_max_alignments")]
    pub max_alignments: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            merge_score_tolerance: default_merge_score_tolerance(),
            gradient_threshold: default_gradient_threshold(),
            filter_pass_count: default_filter_pass_count(),
            filter_sigma: default_filter_sigma(),
            max_alignments: default_max_alignments(),
        }
    }
}

fn default_match_threshold() -> f64 {
    10.0
}
fn default_merge_score_tolerance() -> f64 {
    0.7
}
fn default_gradient_threshold() -> f64 {
    0.15
}
fn default_filter_pass_count() -> f64 {
    8.0
}
fn default_filter_sigma() -> f64 {
    3.0
}
fn default_max_alignments() -> usize {
    1
}

impl MatchConfig {
    /// Same defaults with a different match threshold
    pub fn with_threshold(match_threshold: f64) -> Self {
        Self {
            match_threshold,
            ..Self::default()
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.match_threshold > 0.0) {
            anyhow::bail!("match_threshold must be > 0");
        }
        if self.merge_score_tolerance < 0.0 {
            anyhow::bail!("merge_score_tolerance must be >= 0");
        }
        if self.filter_pass_count < 1.0 {
            anyhow::bail!("filter_pass_count must be >= 1");
        }
        if !(self.filter_sigma > 0.0) {
            anyhow::bail!("filter_sigma must be > 0");
        }
        if self.max_alignments == 0 {
            anyhow::bail!("max_alignments must be >= 1");
        }
        Ok(())
    }
}

/// External fingerprint extractor settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Seconds of audio to fingerprint
    #[serde(default = "default_max_length_s")]
    pub max_length_s: u32,
    #[serde(default = "default_algorithm")]
    pub algorithm: u8,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            max_length_s: default_max_length_s(),
            algorithm: default_algorithm(),
        }
    }
}

fn default_binary() -> String {
    "fpcalc".to_string()
}
fn default_max_length_s() -> u32 {
    120
}
fn default_algorithm() -> u8 {
    crate::codec::DEFAULT_ALGORITHM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_match_config() {
        let config = MatchConfig::default();
        assert_eq!(config.match_threshold, 10.0);
        assert_eq!(config.merge_score_tolerance, 0.7);
        assert_eq!(config.gradient_threshold, 0.15);
        assert_eq!(config.filter_pass_count, 8.0);
        assert_eq!(config.filter_sigma, 3.0);
        assert_eq!(config.max_alignments, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(MatchConfig::with_threshold(0.0).validate().is_err());
        assert!(MatchConfig::with_threshold(f64::NAN).validate().is_err());

        let config = MatchConfig {
            max_alignments: 0,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MatchConfig {
            filter_pass_count: 0.5,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [matching]
            match_threshold = 6.5
            max_alignments = 3

            [extractor]
            binary = "/usr/local/bin/fpcalc"
        "#;

        let config: ChromamatchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.matching.match_threshold, 6.5);
        assert_eq!(config.matching.max_alignments, 3);
        assert_eq!(config.matching.filter_sigma, 3.0);
        assert_eq!(config.extractor.binary, "/usr/local/bin/fpcalc");
        assert_eq!(config.extractor.max_length_s, 120);
        assert_eq!(config.extractor.algorithm, 1);
    }

    #[test]
    fn test_parse_empty_toml() {
        let config: ChromamatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.matching.match_threshold, 10.0);
        assert_eq!(config.extractor.binary, "fpcalc");
    }
}
