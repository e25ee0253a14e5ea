//! Compact textual encoding of raw fingerprints
//!
//! Layout of the decoded byte string:
//!
//! ```text
//! [algorithm: u8][frame count: u24 big endian][normal stream][exception stream]
//! ```
//!
//! Each frame is XORed with its predecessor and the set bits of the result are
//! written as 1-based position deltas, terminated by a `0`. Deltas go into a
//! 3-bit "normal" stream saturating at 7; the excess of every saturated delta
//! goes into a 5-bit "exception" stream. Both streams are packed LSB first.
//! The bytes are rendered as URL-safe base64 without padding.

use crate::error::{DecodeError, EngineError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Algorithm id written into the header by [`encode`]
pub const DEFAULT_ALGORITHM: u8 = 1;

/// Largest frame count the 24-bit header can carry
pub const MAX_FRAMES: usize = (1 << 24) - 1;

const HEADER_SIZE: usize = 4;
const NORMAL_BITS: usize = 3;
const EXCEPTION_BITS: usize = 5;
const MAX_NORMAL_VALUE: u8 = 7;

/// Encode a fingerprint with the default algorithm id
pub fn encode(raw: &[u32]) -> Result<String> {
    encode_with_algorithm(raw, DEFAULT_ALGORITHM)
}

/// Encode a fingerprint, recording `algorithm` in the header
pub fn encode_with_algorithm(raw: &[u32], algorithm: u8) -> Result<String> {
    if raw.len() > MAX_FRAMES {
        return Err(EngineError::Encode {
            len: raw.len(),
            max: MAX_FRAMES,
        });
    }

    let mut normal = BitWriter::default();
    let mut exceptions = BitWriter::default();
    let mut previous = 0u32;

    for &frame in raw {
        let mut rest = frame ^ previous;
        let mut last = 0u32;
        while rest != 0 {
            let position = rest.trailing_zeros() + 1;
            rest &= rest - 1;
            let delta = (position - last) as u8;
            last = position;

            normal.write(delta.min(MAX_NORMAL_VALUE), NORMAL_BITS);
            if delta >= MAX_NORMAL_VALUE {
                exceptions.write(delta - MAX_NORMAL_VALUE, EXCEPTION_BITS);
            }
        }
        normal.write(0, NORMAL_BITS);
        previous = frame;
    }

    let len = raw.len();
    let mut bytes = Vec::with_capacity(HEADER_SIZE + normal.len() + exceptions.len());
    bytes.push(algorithm);
    bytes.push((len >> 16) as u8);
    bytes.push((len >> 8) as u8);
    bytes.push(len as u8);
    bytes.extend(normal.finish());
    bytes.extend(exceptions.finish());

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a token produced by [`encode`]
pub fn decode(token: &str) -> Result<Vec<u32>> {
    decode_with_algorithm(token).map(|(_, frames)| frames)
}

/// Decode a token, also returning the algorithm id stored in its header
pub fn decode_with_algorithm(token: &str) -> Result<(u8, Vec<u32>)> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::TruncatedHeader(bytes.len()).into());
    }

    let algorithm = bytes[0];
    let count = (bytes[1] as usize) << 16 | (bytes[2] as usize) << 8 | bytes[3] as usize;
    let body = &bytes[HEADER_SIZE..];

    // Normal stream ends once `count` terminators have been read
    let mut reader = BitReader::new(body);
    let mut normal = Vec::new();
    let mut terminators = 0;
    while terminators < count {
        let value = reader
            .read(NORMAL_BITS)
            .ok_or(DecodeError::TruncatedNormalBits {
                expected: count,
                found: terminators,
            })?;
        if value == 0 {
            terminators += 1;
        }
        normal.push(value);
    }
    if !reader.padding_is_zero() {
        return Err(DecodeError::NonZeroPadding("normal").into());
    }

    let normal_bytes = (normal.len() * NORMAL_BITS).div_ceil(8);
    let expected_exceptions = normal.iter().filter(|&&v| v == MAX_NORMAL_VALUE).count();
    let mut exception_reader = BitReader::new(&body[normal_bytes..]);
    let mut exceptions_read = 0;

    let mut frames = Vec::with_capacity(count);
    let mut value = 0u32;
    let mut last = 0u32;
    for delta in normal {
        if delta == 0 {
            frames.push(value);
            value = 0;
            last = 0;
            continue;
        }

        let mut delta = delta as u32;
        if delta == MAX_NORMAL_VALUE as u32 {
            let extra = exception_reader.read(EXCEPTION_BITS).ok_or(
                DecodeError::TruncatedExceptionBits {
                    expected: expected_exceptions,
                    found: exceptions_read,
                },
            )?;
            exceptions_read += 1;
            delta += extra as u32;
        }

        let position = last + delta;
        if position > 32 {
            return Err(DecodeError::BitOutOfRange {
                frame: frames.len(),
                position,
            }
            .into());
        }
        value |= 1 << (position - 1);
        last = position;
    }

    if !exception_reader.padding_is_zero() {
        return Err(DecodeError::NonZeroPadding("exception").into());
    }

    let consumed = normal_bytes + (expected_exceptions * EXCEPTION_BITS).div_ceil(8);
    if body.len() > consumed {
        return Err(DecodeError::TrailingBytes(body.len() - consumed).into());
    }

    for i in 1..frames.len() {
        frames[i] ^= frames[i - 1];
    }

    Ok((algorithm, frames))
}

/// LSB-first bit packer
#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    buffer: u32,
    filled: usize,
}

impl BitWriter {
    fn write(&mut self, value: u8, width: usize) {
        self.buffer |= (value as u32 & ((1u32 << width) - 1)) << self.filled;
        self.filled += width;
        while self.filled >= 8 {
            self.bytes.push(self.buffer as u8);
            self.buffer >>= 8;
            self.filled -= 8;
        }
    }

    /// Packed size in bytes, including a partially filled last byte
    fn len(&self) -> usize {
        self.bytes.len() + usize::from(self.filled > 0)
    }

    fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.bytes.push(self.buffer as u8);
        }
        self.bytes
    }
}

/// LSB-first bit unpacker
struct BitReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn read(&mut self, width: usize) -> Option<u8> {
        if self.position + width > self.bytes.len() * 8 {
            return None;
        }
        let mut value = 0u8;
        for i in 0..width {
            let bit = self.position + i;
            if (self.bytes[bit / 8] >> (bit % 8)) & 1 == 1 {
                value |= 1 << i;
            }
        }
        self.position += width;
        Some(value)
    }

    /// Unused bits up to the next byte boundary are all clear
    fn padding_is_zero(&self) -> bool {
        let end = self.position.div_ceil(8) * 8;
        (self.position..end).all(|bit| (self.bytes[bit / 8] >> (bit % 8)) & 1 == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pseudo_random_frames(len: usize, seed: u32) -> Vec<u32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                state
            })
            .collect()
    }

    fn token_from(bytes: Vec<u8>) -> String {
        URL_SAFE_NO_PAD.encode(bytes)
    }

    #[test]
    fn test_single_frame_token() {
        // header [1, 0, 0, 1], deltas [1, 0] -> 0b000_001
        let token = encode(&[1]).unwrap();
        assert_eq!(token, "AQAAAQE");
        assert_eq!(decode(&token).unwrap(), vec![1]);
    }

    #[test]
    fn test_roundtrip_preserves_frames() {
        let cases: Vec<Vec<u32>> = vec![
            vec![0],
            vec![u32::MAX],
            vec![1, 2, 3, 4],
            vec![0x8000_0000, 0x8000_0000, 0, 0x4000_0001],
            vec![u32::MAX, 0, u32::MAX, 0],
            pseudo_random_frames(500, 42),
        ];
        for frames in cases {
            let token = encode(&frames).unwrap();
            assert_eq!(decode(&token).unwrap(), frames);
        }
    }

    #[test]
    fn test_empty_fingerprint_roundtrip() {
        let token = encode(&[]).unwrap();
        assert!(decode(&token).unwrap().is_empty());
    }

    #[test]
    fn test_algorithm_id_is_preserved() {
        let token = encode_with_algorithm(&[7, 8, 9], 4).unwrap();
        let (algorithm, frames) = decode_with_algorithm(&token).unwrap();
        assert_eq!(algorithm, 4);
        assert_eq!(frames, vec![7, 8, 9]);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let token = encode(&[10, 20]).unwrap();
        assert_eq!(decode(&format!("  {}\n", token)).unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let err = decode("not*base64!").unwrap_err();
        assert!(matches!(err, EngineError::Decode(DecodeError::Base64(_))));
    }

    #[test]
    fn test_rejects_short_header() {
        let err = decode(&token_from(vec![1, 0])).unwrap_err();
        assert_eq!(err, EngineError::Decode(DecodeError::TruncatedHeader(2)));
    }

    #[test]
    fn test_rejects_missing_frames() {
        // header claims two frames, body holds one
        let err = decode(&token_from(vec![1, 0, 0, 2, 0b0000_0001])).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Decode(DecodeError::TruncatedNormalBits { expected: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_missing_exception_bits() {
        let mut normal = BitWriter::default();
        normal.write(7, NORMAL_BITS);
        normal.write(0, NORMAL_BITS);
        let mut bytes = vec![1, 0, 0, 1];
        bytes.extend(normal.finish());
        let err = decode(&token_from(bytes)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Decode(DecodeError::TruncatedExceptionBits { expected: 1, found: 0 })
        ));
    }

    #[test]
    fn test_rejects_bit_position_past_32() {
        let mut normal = BitWriter::default();
        normal.write(7, NORMAL_BITS);
        normal.write(7, NORMAL_BITS);
        normal.write(0, NORMAL_BITS);
        let mut exceptions = BitWriter::default();
        exceptions.write(25, EXCEPTION_BITS);
        exceptions.write(0, EXCEPTION_BITS);
        let mut bytes = vec![1, 0, 0, 1];
        bytes.extend(normal.finish());
        bytes.extend(exceptions.finish());
        let err = decode(&token_from(bytes)).unwrap_err();
        assert_eq!(
            err,
            EngineError::Decode(DecodeError::BitOutOfRange {
                frame: 0,
                position: 39
            })
        );
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = URL_SAFE_NO_PAD.decode(encode(&[1, 2]).unwrap()).unwrap();
        bytes.push(0xFF);
        let err = decode(&token_from(bytes)).unwrap_err();
        assert_eq!(err, EngineError::Decode(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn test_rejects_set_padding_bits() {
        // 0x41 = delta 1, terminator, then a stray bit in the padding
        assert_eq!(
            decode("AQAAAUE").unwrap_err(),
            EngineError::Decode(DecodeError::NonZeroPadding("normal"))
        );
        assert_eq!(decode("AQAAAQE").unwrap(), vec![1]);

        let mut normal = BitWriter::default();
        normal.write(7, NORMAL_BITS);
        normal.write(0, NORMAL_BITS);
        let mut exceptions = BitWriter::default();
        exceptions.write(0, EXCEPTION_BITS);
        let mut bytes = vec![1, 0, 0, 1];
        bytes.extend(normal.finish());
        let mut exception_bytes = exceptions.finish();
        exception_bytes[0] |= 0b1000_0000;
        bytes.extend(exception_bytes);
        assert_eq!(
            decode(&token_from(bytes)).unwrap_err(),
            EngineError::Decode(DecodeError::NonZeroPadding("exception"))
        );
    }
}
