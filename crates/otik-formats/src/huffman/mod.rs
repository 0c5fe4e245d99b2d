//! Canonical Huffman codec
//!
//! Encoding counts byte frequencies, builds a Huffman tree with a
//! minimum-weight priority queue, takes each symbol's depth as its code
//! length, and derives canonical codes from the lengths alone. Only the
//! 256-byte length table needs to be stored to decode.
//!
//! # Bit Layout
//!
//! Codes are emitted MSB-first into a bit buffer which is packed into
//! bytes MSB-first. The unused low bits of the final byte are zero and
//! reported as `padding` (0..=7, never 8).
//!
//! # Usage
//!
//! ```rust
//! use otik_formats::huffman;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let packed = huffman::pack(b"AAAABBBCC")?;
//! assert!(packed.lengths.get(b'A') < packed.lengths.get(b'C'));
//!
//! let restored = huffman::unpack(&packed.data, &packed.lengths, packed.total_bits())?;
//! assert_eq!(restored, b"AAAABBBCC");
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod error;
pub mod tree;

pub use canonical::{CanonicalCodes, Code, DecodeTable};
pub use error::{HuffmanError, Result};
pub use tree::{Frequencies, accumulate_frequencies, code_lengths, count_frequencies};

use crate::bits::{CodeLengthTable, byte_padding, bits_to_bytes, bytes_to_bits, push_bits};
use bitvec::prelude::*;

/// Output of [`pack`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanPacked {
    /// Encoded bytes
    pub data: Vec<u8>,
    /// Code lengths needed to decode
    pub lengths: CodeLengthTable,
    /// Zero bits appended to fill the last byte (0..=7)
    pub padding: u8,
}

impl HuffmanPacked {
    /// Number of meaningful bits in `data`
    pub fn total_bits(&self) -> usize {
        self.data.len() * 8 - self.padding as usize
    }
}

/// Compress `data` with a code table derived from its own frequencies
pub fn pack(data: &[u8]) -> Result<HuffmanPacked> {
    let lengths = code_lengths(&count_frequencies(data));
    pack_with_table(data, &lengths)
}

/// Compress `data` with a caller-supplied code table
///
/// Used when several inputs share one table. Fails if `data` contains a
/// symbol without a code.
pub fn pack_with_table(data: &[u8], lengths: &CodeLengthTable) -> Result<HuffmanPacked> {
    let codes = CanonicalCodes::from_lengths(lengths)?;

    let mut bits = BitVec::<u8, Msb0>::with_capacity(data.len() * 2);
    for &symbol in data {
        let code = codes.get(symbol).ok_or(HuffmanError::MissingSymbol(symbol))?;
        push_bits(&mut bits, code.bits, code.length);
    }

    Ok(HuffmanPacked {
        data: bits_to_bytes(&bits),
        lengths: lengths.clone(),
        padding: byte_padding(bits.len()),
    })
}

/// Decode the first `total_bits` bits of `data` with `lengths`
///
/// Bits past `total_bits` are pad and never looked at. A trailing partial
/// code is ignored.
pub fn unpack(data: &[u8], lengths: &CodeLengthTable, total_bits: usize) -> Result<Vec<u8>> {
    unpack_limited(data, lengths, total_bits, usize::MAX)
}

/// Decode like [`unpack`] given the pad count instead of the bit count
pub fn unpack_padded(data: &[u8], lengths: &CodeLengthTable, padding: u8) -> Result<Vec<u8>> {
    let available = data.len() * 8;
    let total_bits =
        available
            .checked_sub(padding as usize)
            .ok_or(HuffmanError::InvalidPadding { padding, available })?;
    unpack(data, lengths, total_bits)
}

/// Decode like [`unpack`], stopping after `max_symbols` symbols
pub fn unpack_limited(
    data: &[u8],
    lengths: &CodeLengthTable,
    total_bits: usize,
    max_symbols: usize,
) -> Result<Vec<u8>> {
    let available = data.len() * 8;
    if total_bits > available {
        return Err(HuffmanError::BitCountOutOfRange {
            total_bits,
            available,
        });
    }

    let table = CanonicalCodes::from_lengths(lengths)?.decode_table();
    let mut out = Vec::new();
    let mut code = 0u64;
    let mut code_len = 0u8;

    for (position, bit) in bytes_to_bits(data)[..total_bits].iter().by_vals().enumerate() {
        if out.len() >= max_symbols {
            break;
        }

        code = (code << 1) | u64::from(bit);
        code_len += 1;

        if let Some(symbol) = table.lookup(code_len, code) {
            out.push(symbol);
            code = 0;
            code_len = 0;
        } else if code_len >= table.max_length() {
            return Err(HuffmanError::InvalidCode { position });
        }
    }

    Ok(out)
}
