//! Splitting an aligned fingerprint pair into similar regions
//!
//! The per-frame bit errors at a fixed alignment are smoothed, and sharp
//! changes in the smoothed curve mark segment boundaries. Each resulting range
//! is scored by its mean bit error.

use crate::alignment::Alignment;
use crate::bits::hamming_distance;
use crate::config::MatchConfig;
use crate::filter::{gaussian_filter, gradient};
use serde::{Deserialize, Serialize};

/// A run of frames where both fingerprints agree closely
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start frame in fingerprint 1
    pub pos1: usize,
    /// Start frame in fingerprint 2
    pub pos2: usize,
    /// Length in frames
    pub duration: usize,
    /// Mean bit error per frame (0 = identical, 32 = every bit differs)
    pub score: f64,
    /// Score of the first piece merged into this segment
    pub left_score: f64,
    /// Score of the last piece merged into this segment
    pub right_score: f64,
}

impl Segment {
    pub fn new(pos1: usize, pos2: usize, duration: usize, score: f64) -> Self {
        Self {
            pos1,
            pos2,
            duration,
            score,
            left_score: score,
            right_score: score,
        }
    }

    /// One past the last frame in fingerprint 1
    pub fn end1(&self) -> usize {
        self.pos1 + self.duration
    }

    /// One past the last frame in fingerprint 2
    pub fn end2(&self) -> usize {
        self.pos2 + self.duration
    }

    /// `other` starts exactly where `self` ends, in both fingerprints
    pub fn is_followed_by(&self, other: &Segment) -> bool {
        self.end1() == other.pos1 && self.end2() == other.pos2
    }

    /// Combine with the segment directly after this one.
    ///
    /// The score of the result is the duration-weighted mean of both scores.
    pub fn merged(&self, other: &Segment) -> Segment {
        debug_assert!(self.is_followed_by(other));
        let duration = self.duration + other.duration;
        let score = (self.score * self.duration as f64 + other.score * other.duration as f64)
            / duration as f64;
        Segment {
            pos1: self.pos1,
            pos2: self.pos2,
            duration,
            score,
            left_score: self.left_score,
            right_score: other.right_score,
        }
    }

    /// Similarity on a 0..=100 scale
    pub fn public_score(&self) -> u32 {
        (100.0 * (1.0 - self.score / 32.0)).round().clamp(0.0, 100.0) as u32
    }

    /// Frame ranges overlap in fingerprint 1
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.pos1 < other.end1() && other.pos1 < self.end1()
    }
}

/// Segments one alignment at a time using a [`MatchConfig`]
#[derive(Debug, Clone)]
pub struct Segmenter {
    match_threshold: f64,
    merge_score_tolerance: f64,
    gradient_threshold: f64,
    filter_pass_count: f64,
    filter_sigma: f64,
}

impl Segmenter {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            match_threshold: config.match_threshold,
            merge_score_tolerance: config.merge_score_tolerance,
            gradient_threshold: config.gradient_threshold,
            filter_pass_count: config.filter_pass_count,
            filter_sigma: config.filter_sigma,
        }
    }

    /// Similar regions of `fp1` and `fp2` at the given alignment, in
    /// increasing position order and never overlapping
    pub fn segment(&self, fp1: &[u32], fp2: &[u32], alignment: &Alignment) -> Vec<Segment> {
        let (offset1, offset2) = alignment.start_positions();
        if offset1 >= fp1.len() || offset2 >= fp2.len() {
            return Vec::new();
        }

        let bit_counts: Vec<f64> = fp1[offset1..]
            .iter()
            .zip(&fp2[offset2..])
            .map(|(&a, &b)| hamming_distance(a, b) as f64)
            .collect();
        let size = bit_counts.len();

        let smoothed = gaussian_filter(&bit_counts, self.filter_pass_count, self.filter_sigma);
        let slope: Vec<f64> = gradient(&smoothed).into_iter().map(f64::abs).collect();
        let boundaries = self.boundaries(&slope);

        log::trace!(
            "Segmenting offset {}: {} frames, {} boundaries",
            alignment.offset,
            size,
            boundaries.len()
        );

        let mut segments: Vec<Segment> = Vec::new();
        let mut begin = 0;
        for end in boundaries {
            let duration = end - begin;
            let score = bit_counts[begin..end].iter().sum::<f64>() / duration as f64;
            if score < self.match_threshold {
                let segment = Segment::new(offset1 + begin, offset2 + begin, duration, score);
                match segments.last_mut() {
                    Some(previous)
                        if previous.is_followed_by(&segment)
                            && (previous.score - score).abs() < self.merge_score_tolerance =>
                    {
                        *previous = previous.merged(&segment);
                    }
                    _ => segments.push(segment),
                }
            } else {
                log::trace!(
                    "Dropping frames {}..{} at offset {}: score {:.2}",
                    offset1 + begin,
                    offset1 + end,
                    alignment.offset,
                    score
                );
            }
            begin = end;
        }

        segments
    }

    /// Segment ends: interior local maxima of the slope above the threshold,
    /// followed by the curve length. Of two adjacent maxima (a flat top),
    /// only the lower index is kept.
    fn boundaries(&self, slope: &[f64]) -> Vec<usize> {
        let size = slope.len();
        let mut peaks: Vec<usize> = Vec::new();
        for i in 1..size.saturating_sub(1) {
            let value = slope[i];
            if value > self.gradient_threshold && value >= slope[i - 1] && value >= slope[i + 1] {
                if peaks.last().map_or(true, |&last| last + 1 < i) {
                    peaks.push(i);
                }
            }
        }
        peaks.push(size);
        peaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn segmenter(threshold: f64) -> Segmenter {
        Segmenter::new(&MatchConfig::with_threshold(threshold))
    }

    #[test]
    fn test_merged_weights_by_duration() {
        let a = Segment::new(0, 10, 30, 2.0);
        let b = Segment::new(30, 40, 10, 6.0);
        assert!(a.is_followed_by(&b));

        let m = a.merged(&b);
        assert_eq!((m.pos1, m.pos2, m.duration), (0, 10, 40));
        assert_abs_diff_eq!(m.score, 3.0, epsilon = 1e-12);
        assert_eq!(m.left_score, 2.0);
        assert_eq!(m.right_score, 6.0);
    }

    #[test]
    fn test_public_score() {
        assert_eq!(Segment::new(0, 0, 1, 0.0).public_score(), 100);
        assert_eq!(Segment::new(0, 0, 1, 16.0).public_score(), 50);
        assert_eq!(Segment::new(0, 0, 1, 32.0).public_score(), 0);
    }

    #[test]
    fn test_overlaps() {
        let a = Segment::new(0, 0, 10, 0.0);
        assert!(a.overlaps(&Segment::new(9, 0, 5, 0.0)));
        assert!(!a.overlaps(&Segment::new(10, 0, 5, 0.0)));
    }

    #[test]
    fn test_identical_fingerprints_give_one_segment() {
        let fp = [1u32, 2, 3, 4];
        let segments = segmenter(5.0).segment(&fp, &fp, &Alignment { offset: 0, count: 4 });
        assert_eq!(segments, vec![Segment::new(0, 0, 4, 0.0)]);
    }

    #[test]
    fn test_dissimilar_tail_is_dropped() {
        let fp1 = vec![0u32; 60];
        let mut fp2 = vec![0u32; 30];
        fp2.extend(vec![u32::MAX; 30]);

        let segments = segmenter(10.0).segment(&fp1, &fp2, &Alignment { offset: 0, count: 30 });
        assert_eq!(segments.len(), 1);
        let segment = segments[0];
        assert_eq!((segment.pos1, segment.pos2), (0, 0));
        assert!(segment.duration >= 25 && segment.duration <= 32);
        assert!(segment.score < 10.0);
    }

    #[test]
    fn test_offsets_shift_positions() {
        let fp1: Vec<u32> = (0..50u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
        let fp2 = fp1[10..].to_vec();
        let segments = segmenter(5.0).segment(&fp1, &fp2, &Alignment { offset: 10, count: 40 });
        assert_eq!(segments, vec![Segment::new(10, 0, 40, 0.0)]);
    }

    fn two_level_pair(high: u32) -> (Vec<u32>, Vec<u32>) {
        let fp1 = vec![0u32; 80];
        let mut fp2 = vec![0u32; 40];
        fp2.extend(vec![high; 40]);
        (fp1, fp2)
    }

    #[test]
    fn test_neighbours_within_tolerance_are_merged() {
        let (fp1, fp2) = two_level_pair(0b11);
        let config = MatchConfig {
            merge_score_tolerance: 2.5,
            ..MatchConfig::default()
        };
        let segments =
            Segmenter::new(&config).segment(&fp1, &fp2, &Alignment { offset: 0, count: 80 });

        assert_eq!(segments.len(), 1);
        let segment = segments[0];
        assert_eq!((segment.pos1, segment.duration), (0, 80));
        assert_abs_diff_eq!(segment.score, 1.0, epsilon = 1e-9);
        assert_eq!(segment.left_score, 0.0);
        assert!(segment.right_score > 1.9);
    }

    #[test]
    fn test_neighbours_outside_tolerance_stay_apart() {
        for high in [0b11u32, 0xFF] {
            let (fp1, fp2) = two_level_pair(high);
            let segments =
                segmenter(10.0).segment(&fp1, &fp2, &Alignment { offset: 0, count: 40 });
            assert_eq!(segments.len(), 2);
            assert!(segments[0].is_followed_by(&segments[1]));
            assert!(segments[0].score < segments[1].score);
            assert_eq!(segments[0].duration + segments[1].duration, 80);
        }
    }

    #[test]
    fn test_boundaries_keep_lower_index_of_flat_top() {
        let s = segmenter(10.0);
        let slope = [0.0, 0.5, 0.5, 0.1, 0.0, 0.9, 0.2];
        assert_eq!(s.boundaries(&slope), vec![1, 5, 7]);
        assert_eq!(s.boundaries(&[]), vec![0]);
        assert_eq!(s.boundaries(&[1.0, 1.0]), vec![2]);
    }

    #[test]
    fn test_out_of_range_alignment_is_empty() {
        let fp = [1u32, 2, 3];
        let segmenter = segmenter(10.0);
        assert!(segmenter.segment(&fp, &fp, &Alignment { offset: 3, count: 2 }).is_empty());
        assert!(segmenter.segment(&fp, &fp, &Alignment { offset: -3, count: 2 }).is_empty());
    }
}
