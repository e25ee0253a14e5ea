//! JSON output formatting

use chromamatch_core::{MatchResult, Segment};
use chromamatch_fp::LoadedFingerprint;
use serde::Serialize;

/// A matched segment as reported on stdout
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub pos1: usize,
    pub pos2: usize,
    pub duration: usize,
    /// Seconds, when the fingerprint file records its audio duration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start1_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start2_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    /// Mean bit error
    pub score: f64,
    /// 0..=100, higher is more similar
    pub similarity: u32,
}

impl SegmentReport {
    pub fn new(segment: &Segment, frame1_s: Option<f64>, frame2_s: Option<f64>) -> Self {
        Self {
            pos1: segment.pos1,
            pos2: segment.pos2,
            duration: segment.duration,
            start1_s: frame1_s.map(|f| segment.pos1 as f64 * f),
            start2_s: frame2_s.map(|f| segment.pos2 as f64 * f),
            duration_s: frame1_s.map(|f| segment.duration as f64 * f),
            score: segment.score,
            similarity: segment.public_score(),
        }
    }
}

/// Seconds covered by one frame
pub fn frame_seconds(fp: &LoadedFingerprint) -> Option<f64> {
    match fp.duration_s {
        Some(d) if d > 0.0 && !fp.codes.is_empty() => Some(d / fp.codes.len() as f64),
        _ => None,
    }
}

fn segment_reports(result: &MatchResult, fp1: &LoadedFingerprint, fp2: &LoadedFingerprint) -> Vec<SegmentReport> {
    let (f1, f2) = (frame_seconds(fp1), frame_seconds(fp2));
    result
        .segments
        .iter()
        .map(|s| SegmentReport::new(s, f1, f2))
        .collect()
}

/// A candidate shift that was segmented
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    /// Shift of fingerprint 2 relative to fingerprint 1, in frames
    pub offset: i64,
    pub count: u32,
    pub histogram_index: usize,
}

/// Report for a single pair
#[derive(Debug, Clone, Serialize)]
pub struct CompareReport {
    pub fingerprint1: String,
    pub fingerprint2: String,
    pub frames1: usize,
    pub frames2: usize,
    /// Whole-fingerprint similarity in `[0, 1]`
    pub similarity: f64,
    pub is_match: bool,
    pub matched_frames: usize,
    /// Lowest segment score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
    pub alignments: Vec<AlignmentReport>,
    pub segments: Vec<SegmentReport>,
}

impl CompareReport {
    pub fn new(
        fp1: &LoadedFingerprint,
        fp2: &LoadedFingerprint,
        similarity: f64,
        result: &MatchResult,
    ) -> Self {
        Self {
            fingerprint1: fp1.path.display().to_string(),
            fingerprint2: fp2.path.display().to_string(),
            frames1: result.len1,
            frames2: result.len2,
            similarity,
            is_match: result.is_match(),
            matched_frames: result.matched_frames(),
            best_score: result.best_score(),
            alignments: result
                .alignments
                .iter()
                .map(|a| AlignmentReport {
                    offset: a.offset,
                    count: a.count,
                    histogram_index: a.histogram_index(result.len2),
                })
                .collect(),
            segments: segment_reports(result, fp1, fp2),
        }
    }
}

/// One reference that matched the query
#[derive(Debug, Clone, Serialize)]
pub struct MatchEntry {
    pub reference: String,
    pub path: String,
    pub frames: usize,
    pub matched_frames: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_duration_s: Option<f64>,
    /// Best segment similarity, 0..=100
    pub best_similarity: u32,
    pub segments: Vec<SegmentReport>,
}

impl MatchEntry {
    /// `None` when nothing matched
    pub fn new(query: &LoadedFingerprint, reference: &LoadedFingerprint, result: &MatchResult) -> Option<Self> {
        let best_similarity = result.segments.iter().map(|s| s.public_score()).max()?;
        let matched_frames = result.matched_frames();
        Some(Self {
            reference: reference.name.clone(),
            path: reference.path.display().to_string(),
            frames: reference.codes.len(),
            matched_frames,
            matched_duration_s: frame_seconds(query).map(|f| matched_frames as f64 * f),
            best_similarity,
            segments: segment_reports(result, query, reference),
        })
    }
}

#[derive(Serialize)]
struct MatchOutput {
    query_path: String,
    detections: usize,
    results: Vec<MatchEntry>,
}

/// Longest total match first, then by reference name
pub fn sort_entries(entries: &mut [MatchEntry]) {
    entries.sort_by(|a, b| {
        b.matched_frames
            .cmp(&a.matched_frames)
            .then_with(|| a.reference.cmp(&b.reference))
    });
}

/// Print any serializable report as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}

/// Print matcher results with detection count
pub fn print_json_results(query_path: &str, mut results: Vec<MatchEntry>) {
    sort_entries(&mut results);
    let output = MatchOutput {
        query_path: query_path.to_string(),
        detections: results.len(),
        results,
    };
    print_json(&output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chromamatch_core::Alignment;
    use chromamatch_fp::FingerprintFormat;
    use std::path::PathBuf;

    fn loaded(name: &str, frames: usize, duration_s: Option<f64>) -> LoadedFingerprint {
        LoadedFingerprint {
            name: name.to_string(),
            path: PathBuf::from(format!("/db/{}", name)),
            format: FingerprintFormat::Token,
            duration_s,
            codes: vec![0; frames],
        }
    }

    fn result_with(segments: Vec<Segment>) -> MatchResult {
        MatchResult {
            len1: 100,
            len2: 100,
            alignments: Vec::new(),
            segments,
        }
    }

    #[test]
    fn test_frame_seconds() {
        assert_eq!(frame_seconds(&loaded("a", 10, Some(5.0))), Some(0.5));
        assert_eq!(frame_seconds(&loaded("a", 10, None)), None);
        assert_eq!(frame_seconds(&loaded("a", 0, Some(5.0))), None);
    }

    #[test]
    fn test_segment_report_seconds() {
        let segment = Segment::new(10, 4, 20, 0.0);
        let report = SegmentReport::new(&segment, Some(0.5), None);
        assert_eq!(report.start1_s, Some(5.0));
        assert_eq!(report.start2_s, None);
        assert_eq!(report.duration_s, Some(10.0));
        assert_eq!(report.similarity, 100);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("start2_s").is_none());
    }

    #[test]
    fn test_compare_report() {
        let fp1 = loaded("a", 100, Some(10.0));
        let fp2 = loaded("b", 80, None);
        let result = MatchResult {
            len1: 100,
            len2: 80,
            alignments: vec![Alignment { offset: -5, count: 40 }],
            segments: vec![Segment::new(0, 5, 30, 2.0), Segment::new(40, 45, 20, 0.5)],
        };

        let report = CompareReport::new(&fp1, &fp2, 0.75, &result);
        assert!(report.is_match);
        assert_eq!(report.matched_frames, 50);
        assert_eq!(report.best_score, Some(0.5));
        assert_eq!(report.alignments.len(), 1);
        assert_eq!(report.alignments[0].histogram_index, 75);
        assert_eq!(report.segments[1].start1_s, Some(4.0));

        let empty = CompareReport::new(&fp1, &fp2, 0.1, &result_with(Vec::new()));
        assert!(!empty.is_match);
        let json = serde_json::to_value(&empty).unwrap();
        assert!(json.get("best_score").is_none());
    }

    #[test]
    fn test_match_entry_requires_segments() {
        let query = loaded("q", 100, Some(50.0));
        let reference = loaded("r", 100, None);
        assert!(MatchEntry::new(&query, &reference, &result_with(Vec::new())).is_none());

        let entry = MatchEntry::new(
            &query,
            &reference,
            &result_with(vec![Segment::new(0, 0, 30, 16.0), Segment::new(50, 50, 10, 0.0)]),
        )
        .unwrap();
        assert_eq!(entry.matched_frames, 40);
        assert_eq!(entry.matched_duration_s, Some(20.0));
        assert_eq!(entry.best_similarity, 100);
        assert_eq!(entry.path, "/db/r");
    }

    #[test]
    fn test_sort_entries_by_matched_frames() {
        let query = loaded("q", 100, None);
        let make = |name: &str, frames: usize| {
            MatchEntry::new(&query, &loaded(name, 100, None), &result_with(vec![Segment::new(0, 0, frames, 1.0)])).unwrap()
        };
        let mut entries = vec![make("b", 10), make("c", 40), make("a", 10)];
        sort_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
