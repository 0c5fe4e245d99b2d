//! Canonical code derivation from a code-length table
//!
//! Symbols are sorted by (length, symbol value). For each length level in
//! increasing order the first code is
//! `(previous_level_first_code + count_at_previous_level) << 1`, and codes
//! within a level are assigned sequentially in increasing symbol order.

use crate::bits::{CodeLengthTable, MAX_CODE_LENGTH};
use crate::huffman::error::Result;
use std::collections::HashMap;

/// A single canonical code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code {
    /// Code value, right-aligned
    pub bits: u64,
    /// Number of significant bits
    pub length: u8,
}

/// Symbol → code mapping derived from a length table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCodes {
    codes: [Option<Code>; 256],
}

impl CanonicalCodes {
    /// Derive canonical codes from `table`
    ///
    /// The table is validated first, so every produced code fits in its
    /// length and the set is prefix-free.
    pub fn from_lengths(table: &CodeLengthTable) -> Result<Self> {
        table.validate()?;

        let mut codes = [None; 256];
        let max_length = table.max_length() as usize;
        if max_length == 0 {
            return Ok(Self { codes });
        }

        let mut count_per_length = [0u64; MAX_CODE_LENGTH as usize + 1];
        for (_, length) in table.present() {
            count_per_length[length as usize] += 1;
        }

        let mut next_code = [0u64; MAX_CODE_LENGTH as usize + 1];
        let mut code = 0u64;
        for length in 1..=max_length {
            code = (code + count_per_length[length - 1]) << 1;
            next_code[length] = code;
        }

        // present() yields ascending symbols, so each level fills in symbol order
        for (symbol, length) in table.present() {
            let slot = &mut next_code[length as usize];
            codes[symbol as usize] = Some(Code {
                bits: *slot,
                length,
            });
            *slot += 1;
        }

        Ok(Self { codes })
    }

    /// Code for `symbol`, if present
    pub const fn get(&self, symbol: u8) -> Option<Code> {
        self.codes[symbol as usize]
    }

    /// Iterate `(symbol, code)` in symbol order
    pub fn iter(&self) -> impl Iterator<Item = (u8, Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(s, c)| c.map(|c| (s as u8, c)))
    }

    /// Build the (length, code) → symbol lookup used by the decoder
    pub fn decode_table(&self) -> DecodeTable {
        let mut by_code = HashMap::new();
        let mut max_length = 0;
        for (symbol, code) in self.iter() {
            by_code.insert((code.length, code.bits), symbol);
            max_length = max_length.max(code.length);
        }
        DecodeTable {
            by_code,
            max_length,
        }
    }
}

/// Decoder lookup keyed by (code length, code value)
#[derive(Debug, Clone)]
pub struct DecodeTable {
    by_code: HashMap<(u8, u64), u8>,
    max_length: u8,
}

impl DecodeTable {
    /// Symbol for the accumulated `code` of `length` bits
    pub fn lookup(&self, length: u8, code: u64) -> Option<u8> {
        self.by_code.get(&(length, code)).copied()
    }

    /// Longest code in the table (0 when empty)
    pub const fn max_length(&self) -> u8 {
        self.max_length
    }
}
