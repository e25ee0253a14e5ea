//! Hash-bucketed offset histogram between two fingerprints
//!
//! Every frame is reduced to its top [`ALIGN_BITS`] bits and packed together
//! with its index and source into a single `u32` record:
//!
//! ```text
//! [strip hash: 12 bits][source: 1 bit][frame index: 19 bits]
//! ```
//!
//! Sorting the records groups frames with the same strip hash, and inside a
//! bucket puts every frame of fingerprint 1 before those of fingerprint 2.

use crate::error::{EngineError, Result, Side};
use serde::{Deserialize, Serialize};

/// High-order bits of each frame used as the coarse hash
pub const ALIGN_BITS: u32 = 12;
pub const HASH_SHIFT: u32 = 32 - ALIGN_BITS;
pub const HASH_MASK: u32 = ((1 << ALIGN_BITS) - 1) << HASH_SHIFT;
pub const OFFSET_MASK: u32 = (1 << (32 - ALIGN_BITS - 1)) - 1;
pub const SOURCE_MASK: u32 = 1 << (32 - ALIGN_BITS - 1);

/// A candidate shift of fingerprint 2 relative to fingerprint 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// Positive when fingerprint 2 starts later in fingerprint 1
    pub offset: i64,
    /// Number of strip-hash coincidences at this shift
    pub count: u32,
}

impl Alignment {
    /// Histogram bucket this alignment was read from, given `len(fp2)`
    pub fn histogram_index(&self, len2: usize) -> usize {
        (self.offset + len2 as i64) as usize
    }

    /// Clip the shift into start positions for both fingerprints
    pub fn start_positions(&self) -> (usize, usize) {
        if self.offset >= 0 {
            (self.offset as usize, 0)
        } else {
            (0, self.offset.unsigned_abs() as usize)
        }
    }
}

#[inline]
fn strip_hash(frame: u32) -> u32 {
    frame >> HASH_SHIFT
}

/// Fails when `len` frames cannot be indexed by an alignment record
pub fn check_length(which: Side, len: usize) -> Result<()> {
    if len + 1 >= OFFSET_MASK as usize {
        return Err(EngineError::FingerprintTooLong {
            which,
            len,
            capacity: OFFSET_MASK as usize,
        });
    }
    Ok(())
}

/// Coincidence counts per relative offset, indexed by `index1 + len2 - index2`
pub fn offset_histogram(fp1: &[u32], fp2: &[u32]) -> Result<Vec<u32>> {
    check_length(Side::First, fp1.len())?;
    check_length(Side::Second, fp2.len())?;

    let mut records = Vec::with_capacity(fp1.len() + fp2.len());
    for (i, &frame) in fp1.iter().enumerate() {
        records.push(strip_hash(frame) << HASH_SHIFT | (i as u32 & OFFSET_MASK));
    }
    for (i, &frame) in fp2.iter().enumerate() {
        records.push(strip_hash(frame) << HASH_SHIFT | (i as u32 & OFFSET_MASK) | SOURCE_MASK);
    }
    records.sort_unstable();

    let len2 = fp2.len();
    let mut histogram = vec![0u32; fp1.len() + fp2.len()];
    for (pos, &record) in records.iter().enumerate() {
        // once fingerprint 2 shows up, the bucket has no fingerprint 1 frames left
        if record & SOURCE_MASK != 0 {
            continue;
        }
        let hash = record & HASH_MASK;
        let index1 = (record & OFFSET_MASK) as usize;
        for &other in records[pos + 1..].iter().take_while(|&&r| r & HASH_MASK == hash) {
            if other & SOURCE_MASK != 0 {
                let index2 = (other & OFFSET_MASK) as usize;
                histogram[index1 + len2 - index2] += 1;
            }
        }
    }

    Ok(histogram)
}

/// Local maxima of the histogram with more than one coincidence, best first
pub fn histogram_peaks(histogram: &[u32], len2: usize) -> Vec<Alignment> {
    let size = histogram.len();
    let mut peaks: Vec<(u32, usize)> = histogram
        .iter()
        .enumerate()
        .filter(|&(i, &count)| {
            count > 1
                && (i == 0 || histogram[i - 1] <= count)
                && (i + 1 == size || histogram[i + 1] <= count)
        })
        .map(|(i, &count)| (count, i))
        .collect();

    peaks.sort_unstable_by(|a, b| b.cmp(a));

    peaks
        .into_iter()
        .map(|(count, index)| Alignment {
            offset: index as i64 - len2 as i64,
            count,
        })
        .collect()
}

/// Ranked alignment candidates between two fingerprints
pub fn find_alignments(fp1: &[u32], fp2: &[u32]) -> Result<Vec<Alignment>> {
    let histogram = offset_histogram(fp1, fp2)?;
    let alignments = histogram_peaks(&histogram, fp2.len());

    log::debug!(
        "Alignment search: {} x {} frames, {} peaks{}",
        fp1.len(),
        fp2.len(),
        alignments.len(),
        alignments
            .first()
            .map(|a| format!(", best offset {} ({} hits)", a.offset, a.count))
            .unwrap_or_default()
    );

    Ok(alignments)
}
