//! Error types for the comparison engine
//!
//! Every condition here is an input error reported synchronously to the
//! caller. The engine never retries and never substitutes a partial result.

use thiserror::Error;

/// Which of the two compared fingerprints an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::First => write!(f, "fingerprint 1"),
            Side::Second => write!(f, "fingerprint 2"),
        }
    }
}

/// Errors surfaced by the engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Encoded token could not be turned back into frames
    #[error("invalid encoded fingerprint: {0}")]
    Decode(#[from] DecodeError),

    /// Frame count does not fit the 24-bit header field
    #[error("cannot encode {len} frames (at most {max} supported)")]
    Encode { len: usize, max: usize },

    /// `compare` needs at least one frame on both sides
    #[error("cannot compare an empty fingerprint")]
    EmptyFingerprint,

    /// Frame index cannot be packed into the offset bits of an alignment record
    #[error("{which} is too long ({len} frames, capacity {capacity})")]
    FingerprintTooLong {
        which: Side,
        len: usize,
        capacity: usize,
    },
}

/// Ways an encoded token can be malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not valid base64: {0}")]
    Base64(String),

    #[error("header truncated ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("bit stream ended after {found} of {expected} frames")]
    TruncatedNormalBits { expected: usize, found: usize },

    #[error("exception stream ended after {found} of {expected} values")]
    TruncatedExceptionBits { expected: usize, found: usize },

    #[error("bit position {position} out of range in frame {frame}")]
    BitOutOfRange { frame: usize, position: u32 },

    #[error("non-zero padding after the {0} stream")]
    NonZeroPadding(&'static str),

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

pub type Result<T> = std::result::Result<T, EngineError>;
