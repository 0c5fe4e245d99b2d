//! Test utilities shared by the format and codec test modules

use crate::OtikFormat;
use std::fmt::Debug;

/// Test round-trip serialization for a format instance
///
/// Verifies that a format can be serialized and deserialized back
/// to an equivalent value, and that rebuilding the parsed value yields
/// the same bytes.
pub fn test_round_trip<T>(original: &T) -> Result<(), Box<dyn std::error::Error>>
where
    T: OtikFormat + PartialEq + Debug,
{
    let data = original.build()?;
    let parsed = T::parse(&data)?;

    if original != &parsed {
        return Err(format!(
            "Round-trip verification failed:\nOriginal: {:?}\nParsed: {:?}",
            original, parsed
        )
        .into());
    }

    T::verify_round_trip(&data)
}

/// Deterministic pseudo-random bytes (xorshift64*) for fixture data
pub fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            (state.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 56) as u8
        })
        .collect()
}

/// Text-like bytes with a skewed distribution, compressible by Huffman
pub fn skewed_text(len: usize) -> Vec<u8> {
    const PATTERN: &[u8] = b"the quick brown fox jumps over the lazy dog; eeee aaaa ttt ";
    PATTERN.iter().copied().cycle().take(len).collect()
}
