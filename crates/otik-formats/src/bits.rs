//! Bit/byte conversion and the serialized code-length table
//!
//! All bit sequences are MSB-first: bit 0 of a sequence is the most
//! significant bit of the first byte. Packing a sequence whose length is not
//! a multiple of 8 fills the unused low bits of the final byte with zeros.

use crate::OtikFormat;
use crate::huffman::HuffmanError;
use binrw::{BinRead, BinWrite};
use bitvec::prelude::*;

/// Number of entries in a code-length table (one per byte value)
pub const CODE_TABLE_SIZE: usize = 256;

/// Longest code length the decoder accepts
///
/// Codes are held in a `u64`. A length above 64 would need more than 2^64
/// input bytes with Fibonacci-like frequencies, so this never constrains
/// real data.
pub const MAX_CODE_LENGTH: u8 = 64;

/// View a byte slice as an MSB-first bit sequence (zero copy)
pub fn bytes_to_bits(data: &[u8]) -> &BitSlice<u8, Msb0> {
    data.view_bits::<Msb0>()
}

/// Pack an MSB-first bit sequence into bytes, zero-filling the last byte
pub fn bits_to_bytes(bits: &BitSlice<u8, Msb0>) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    out.view_bits_mut::<Msb0>()[..bits.len()].copy_from_bitslice(bits);
    out
}

/// Append the low `length` bits of `value` to `bits`, most significant first
pub fn push_bits(bits: &mut BitVec<u8, Msb0>, value: u64, length: u8) {
    for shift in (0..length).rev() {
        bits.push((value >> shift) & 1 == 1);
    }
}

/// Number of zero bits needed to fill the final byte of `bit_len` bits
pub const fn byte_padding(bit_len: usize) -> u8 {
    ((8 - bit_len % 8) % 8) as u8
}

/// Per-symbol Huffman code lengths, indexed by byte value
///
/// A length of 0 means the symbol does not occur. The table serializes to
/// exactly 256 bytes and is embedded in the archive meta region.
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
pub struct CodeLengthTable {
    lengths: [u8; CODE_TABLE_SIZE],
}

impl CodeLengthTable {
    /// Create an all-zero table (no symbols present)
    pub const fn empty() -> Self {
        Self {
            lengths: [0; CODE_TABLE_SIZE],
        }
    }

    /// Create a table from a raw 256-byte array
    pub const fn from_array(lengths: [u8; CODE_TABLE_SIZE]) -> Self {
        Self { lengths }
    }

    /// Create a table from a byte slice, which must be exactly 256 bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, HuffmanError> {
        let lengths: [u8; CODE_TABLE_SIZE] =
            data.try_into()
                .map_err(|_| HuffmanError::InvalidTableSize {
                    expected: CODE_TABLE_SIZE,
                    actual: data.len(),
                })?;
        Ok(Self { lengths })
    }

    /// Raw table bytes
    pub const fn as_bytes(&self) -> &[u8; CODE_TABLE_SIZE] {
        &self.lengths
    }

    /// Code length for `symbol` (0 if absent)
    pub const fn get(&self, symbol: u8) -> u8 {
        self.lengths[symbol as usize]
    }

    /// Set the code length for `symbol`
    pub fn set(&mut self, symbol: u8, length: u8) {
        self.lengths[symbol as usize] = length;
    }

    /// True when no symbol has a code
    pub fn is_empty(&self) -> bool {
        self.lengths.iter().all(|&l| l == 0)
    }

    /// Number of symbols with a non-zero length
    pub fn symbol_count(&self) -> usize {
        self.lengths.iter().filter(|&&l| l != 0).count()
    }

    /// Longest code length in the table
    pub fn max_length(&self) -> u8 {
        self.lengths.iter().copied().max().unwrap_or(0)
    }

    /// Iterate `(symbol, length)` over present symbols in symbol order
    pub fn present(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.lengths
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l != 0)
            .map(|(s, &l)| (s as u8, l))
    }

    /// Check that the lengths describe a decodable prefix code
    ///
    /// Every length must be at most [`MAX_CODE_LENGTH`] and the Kraft sum
    /// `Σ 2^-len` must not exceed 1. A single symbol of length 1 is allowed.
    pub fn validate(&self) -> Result<(), HuffmanError> {
        let mut kraft: u128 = 0;
        for (symbol, length) in self.present() {
            if length > MAX_CODE_LENGTH {
                return Err(HuffmanError::CodeLengthTooLong { symbol, length });
            }
            kraft += 1u128 << (MAX_CODE_LENGTH - length);
        }

        if kraft > 1u128 << MAX_CODE_LENGTH {
            return Err(HuffmanError::OversubscribedTable);
        }

        Ok(())
    }
}

impl Default for CodeLengthTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl OtikFormat for CodeLengthTable {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let table = Self::from_bytes(data)?;
        table.validate()?;
        Ok(table)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        self.validate()?;
        Ok(self.lengths.to_vec())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::test_round_trip;

    #[test]
    fn test_bytes_to_bits_msb_first() {
        let bits = bytes_to_bits(&[0b1010_0001]);
        let collected: Vec<bool> = bits.iter().by_vals().collect();
        assert_eq!(
            collected,
            vec![true, false, true, false, false, false, false, true]
        );
    }

    #[test]
    fn test_bits_to_bytes_zero_fills_tail() {
        let mut bits = BitVec::<u8, Msb0>::new();
        push_bits(&mut bits, 0b101, 3);
        push_bits(&mut bits, 0b11, 2);
        assert_eq!(bits_to_bytes(&bits), vec![0b1011_1000]);

        let empty = BitVec::<u8, Msb0>::new();
        assert!(bits_to_bytes(&empty).is_empty());
    }

    #[test]
    fn test_bits_to_bytes_from_unaligned_slice() {
        let data = [0xFFu8, 0x00];
        let bits = &bytes_to_bits(&data)[4..12];
        assert_eq!(bits_to_bytes(bits), vec![0xF0]);
    }

    #[test]
    fn test_byte_padding() {
        assert_eq!(byte_padding(0), 0);
        assert_eq!(byte_padding(1), 7);
        assert_eq!(byte_padding(8), 0);
        assert_eq!(byte_padding(13), 3);
    }

    #[test]
    fn test_code_table_accessors() {
        let mut table = CodeLengthTable::empty();
        assert!(table.is_empty());

        table.set(b'A', 1);
        table.set(b'B', 2);
        table.set(b'C', 2);

        assert_eq!(table.get(b'A'), 1);
        assert_eq!(table.symbol_count(), 3);
        assert_eq!(table.max_length(), 2);
        assert_eq!(
            table.present().collect::<Vec<_>>(),
            vec![(b'A', 1), (b'B', 2), (b'C', 2)]
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_code_table_rejects_wrong_size() {
        assert!(matches!(
            CodeLengthTable::from_bytes(&[0u8; 255]),
            Err(HuffmanError::InvalidTableSize {
                expected: 256,
                actual: 255
            })
        ));
    }

    #[test]
    fn test_code_table_rejects_oversubscribed() {
        let mut table = CodeLengthTable::empty();
        table.set(0, 1);
        table.set(1, 1);
        table.set(2, 1);
        assert!(matches!(
            table.validate(),
            Err(HuffmanError::OversubscribedTable)
        ));
    }

    #[test]
    fn test_code_table_rejects_long_codes() {
        let mut table = CodeLengthTable::empty();
        table.set(7, 65);
        assert!(matches!(
            table.validate(),
            Err(HuffmanError::CodeLengthTooLong {
                symbol: 7,
                length: 65
            })
        ));
    }

    #[test]
    fn test_code_table_round_trip() {
        let mut table = CodeLengthTable::empty();
        table.set(b'x', 1);
        table.set(b'y', 1);
        test_round_trip(&table).expect("Round trip should succeed");
    }
}
