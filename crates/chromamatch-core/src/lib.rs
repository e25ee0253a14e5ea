//! Chromamatch Core - Acoustic Fingerprint Comparison
//!
//! Compares two chroma-hash fingerprints (sequences of `u32` frames produced
//! by an external extractor) and finds which spans of the two recordings line
//! up with each other.
//!
//! Pipeline: [`alignment`] finds candidate time shifts from a histogram of
//! strip-hash coincidences, [`segmenter`] smooths the per-frame bit errors at
//! a shift ([`filter`]) and cuts them into scored [`Segment`]s, and
//! [`matcher`] exposes the whole thing as pure functions.

pub mod alignment;
pub mod bits;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod matcher;
pub mod segmenter;

pub use alignment::{find_alignments, Alignment, ALIGN_BITS};
pub use bits::{hamming_distance, popcount};
pub use codec::{decode, encode};
pub use config::{ChromamatchConfig, ExtractorConfig, MatchConfig};
pub use error::{DecodeError, EngineError, Side};
pub use extractor::{ExtractedFingerprint, ExtractionError, FpcalcExtractor};
pub use matcher::{compare, match_fingerprints, MatchResult, Matcher};
pub use segmenter::{Segment, Segmenter};

/// Decode two tokens and match them with the given configuration
pub fn match_encoded(token1: &str, token2: &str, config: &MatchConfig) -> error::Result<MatchResult> {
    let fp1 = codec::decode(token1)?;
    let fp2 = codec::decode(token2)?;
    Matcher::new(config.clone()).match_result(&fp1, &fp2)
}
