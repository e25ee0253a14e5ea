//! Whole-fingerprint similarity and segment matching
//!
//! Everything here is a pure function of its inputs. A [`Matcher`] only holds
//! its configuration, so one instance can be shared across threads and used
//! for any number of independent comparisons.

use crate::alignment::{find_alignments, Alignment};
use crate::bits::hamming_distance;
use crate::config::MatchConfig;
use crate::error::{EngineError, Result};
use crate::segmenter::{Segment, Segmenter};
use serde::{Deserialize, Serialize};


/// Outcome of matching two fingerprints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Frames in fingerprint 1
    pub len1: usize,
    /// Frames in fingerprint 2
    pub len2: usize,
    /// Alignments that were segmented, best first
    pub alignments: Vec<Alignment>,
    /// Matched regions ordered by position in fingerprint 1
    pub segments: Vec<Segment>,
}

impl MatchResult {
    /// Total matched frames across all segments
    pub fn matched_frames(&self) -> usize {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Lowest segment score, if anything matched
    pub fn best_score(&self) -> Option<f64> {
        self.segments.iter().map(|s| s.score).reduce(f64::min)
    }

    pub fn is_match(&self) -> bool {
        !self.segments.is_empty()
    }
}

/// Coarse similarity in `[0, 1]`: the shorter fingerprint is slid across the
/// longer one and the shift with the fewest bit errors decides the score.
pub fn compare(fp1: &[u32], fp2: &[u32]) -> Result<f64> {
    if fp1.is_empty() || fp2.is_empty() {
        return Err(EngineError::EmptyFingerprint);
    }

    let (short, long) = if fp1.len() <= fp2.len() {
        (fp1, fp2)
    } else {
        (fp2, fp1)
    };

    let min_error = (0..=long.len() - short.len())
        .map(|shift| {
            short
                .iter()
                .zip(&long[shift..])
                .map(|(&a, &b)| hamming_distance(a, b) as u64)
                .sum::<u64>()
        })
        .min()
        .unwrap_or(0);

    Ok(1.0 - min_error as f64 / (32.0 * short.len() as f64))
}

/// Matching segments at the best alignment, using default settings
pub fn match_fingerprints(fp1: &[u32], fp2: &[u32], match_threshold: f64) -> Result<Vec<Segment>> {
    Matcher::new(MatchConfig::with_threshold(match_threshold)).match_segments(fp1, fp2)
}

/// Configured comparison facade
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatchConfig,
    segmenter: Segmenter,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        let segmenter = Segmenter::new(&config);
        Self { config, segmenter }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// See [`compare`]
    pub fn compare(&self, fp1: &[u32], fp2: &[u32]) -> Result<f64> {
        compare(fp1, fp2)
    }

    /// Matched segments only
    pub fn match_segments(&self, fp1: &[u32], fp2: &[u32]) -> Result<Vec<Segment>> {
        self.match_result(fp1, fp2).map(|result| result.segments)
    }

    /// Run the alignment search and segment the top `max_alignments`
    /// candidates. Segments from lower-ranked alignments are only kept where
    /// they do not overlap (in fingerprint 1) a segment already accepted.
    pub fn match_result(&self, fp1: &[u32], fp2: &[u32]) -> Result<MatchResult> {
        let alignments: Vec<Alignment> = find_alignments(fp1, fp2)?
            .into_iter()
            .take(self.config.max_alignments)
            .collect();

        let mut segments: Vec<Segment> = Vec::new();
        for alignment in &alignments {
            for segment in self.segmenter.segment(fp1, fp2, alignment) {
                if segments.iter().any(|kept| kept.overlaps(&segment)) {
                    log::trace!(
                        "Skipping segment at {} (offset {}): overlaps a better alignment",
                        segment.pos1,
                        alignment.offset
                    );
                    continue;
                }
                segments.push(segment);
            }
        }
        segments.sort_by_key(|s| s.pos1);

        log::debug!(
            "Matched {} x {} frames: {} alignments evaluated, {} segments",
            fp1.len(),
            fp2.len(),
            alignments.len(),
            segments.len()
        );

        Ok(MatchResult {
            len1: fp1.len(),
            len2: fp2.len(),
            alignments,
            segments,
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}
