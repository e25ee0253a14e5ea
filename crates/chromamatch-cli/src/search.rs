//! Matching loaded fingerprint files

use crate::output::{CompareReport, MatchEntry};
use anyhow::{Context, Result};
use chromamatch_core::alignment::check_length;
use chromamatch_core::{EngineError, Matcher, Side};
use chromamatch_fp::LoadedFingerprint;
use rayon::prelude::*;

/// Segment and score a single pair
pub fn compare_pair(matcher: &Matcher, fp1: &LoadedFingerprint, fp2: &LoadedFingerprint) -> Result<CompareReport> {
    // match_result rejects oversized input before the quadratic compare runs
    let result = matcher.match_result(&fp1.codes, &fp2.codes)?;
    let similarity = matcher.compare(&fp1.codes, &fp2.codes)?;
    log::info!(
        "Similarity {:.3}, {} segments covering {} frames",
        similarity,
        result.segments.len(),
        result.matched_frames()
    );
    Ok(CompareReport::new(fp1, fp2, similarity, &result))
}

/// Match `query` against every reference in parallel.
///
/// An unusable query is an error. A reference that cannot be matched is
/// skipped with a warning, and so is one whose best segment similarity is
/// below `min_score`.
pub fn search(
    matcher: &Matcher,
    query: &LoadedFingerprint,
    references: &[LoadedFingerprint],
    min_score: u32,
) -> Result<Vec<MatchEntry>> {
    check_length(Side::First, query.codes.len())
        .with_context(|| format!("Invalid query fingerprint: {}", query.path.display()))?;
    log::info!(
        "Matching {} against {} references (threshold {})",
        query.name,
        references.len(),
        matcher.config().match_threshold
    );

    let entries: Vec<Option<MatchEntry>> = references
        .par_iter()
        .map(|reference| match matcher.match_result(&query.codes, &reference.codes) {
            Ok(result) => Ok(MatchEntry::new(query, reference, &result)),
            Err(e @ EngineError::FingerprintTooLong { which: Side::Second, .. }) => {
                log::warn!("Skipping {}: {}", reference.name, e);
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to match against {}", reference.name)),
        })
        .collect::<Result<_>>()?;

    Ok(entries
        .into_iter()
        .flatten()
        .filter(|entry| {
            if entry.best_similarity < min_score {
                log::debug!(
                    "Filtered match {}: similarity {} < {}",
                    entry.reference,
                    entry.best_similarity,
                    min_score
                );
                return false;
            }
            true
        })
        .collect())
}
