//! Bit counting over fingerprint frames

/// Number of set bits in `x` (0..=32)
#[inline]
pub fn popcount(x: u32) -> u8 {
    x.count_ones() as u8
}

/// Number of differing bits between two frames
#[inline]
pub fn hamming_distance(x: u32, y: u32) -> u8 {
    popcount(x ^ y)
}
