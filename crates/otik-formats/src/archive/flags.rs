//! Codec flag bits shared by the archive header and file-table records

use binrw::{BinRead, BinWrite};
use std::fmt;

/// Bitmask describing which transforms and checks apply
///
/// The header stores the flags as a 32-bit word; records store the low
/// byte. All defined bits fit in that byte.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CodecFlags {
    /// Raw flag value
    pub value: u32,
}

impl CodecFlags {
    /// No transforms
    pub const NONE: u32 = 0x00;

    /// Canonical Huffman coding applied (bit 0)
    pub const HUFFMAN: u32 = 0x01;

    /// Hamming coding applied (bit 1)
    pub const HAMMING: u32 = 0x02;

    /// CRC32 checksums requested (bit 2)
    pub const CRC32: u32 = 0x04;

    /// SHA-256 digest requested (bit 3)
    pub const SHA256: u32 = 0x08;

    /// Index section present (bit 4)
    pub const INDEX_TABLE: u32 = 0x10;

    /// Hamming blocks carry a global parity bit (bit 5)
    pub const HAMMING_SECDED: u32 = 0x20;

    /// Every defined bit
    pub const ALL: u32 = 0x3F;

    const NAMES: [(u32, &'static str); 6] = [
        (Self::HUFFMAN, "huffman"),
        (Self::HAMMING, "hamming"),
        (Self::CRC32, "crc32"),
        (Self::SHA256, "sha256"),
        (Self::INDEX_TABLE, "index-table"),
        (Self::HAMMING_SECDED, "secded"),
    ];

    /// Create flags from a raw value
    pub const fn new(value: u32) -> Self {
        Self { value }
    }

    /// Check if flag is set
    pub const fn has(&self, flag: u32) -> bool {
        (self.value & flag) != 0
    }

    /// Set flag
    pub fn set(&mut self, flag: u32) {
        self.value |= flag;
    }

    /// Clear flag
    pub fn clear(&mut self, flag: u32) {
        self.value &= !flag;
    }

    /// Set or clear flag
    pub fn toggle(&mut self, flag: u32, on: bool) {
        if on {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Bits outside the defined set
    pub const fn unknown_bits(&self) -> u32 {
        self.value & !Self::ALL
    }

    /// Low byte as stored in a file-table record
    pub const fn to_record_byte(self) -> u8 {
        (self.value & 0xFF) as u8
    }

    /// Names of the set flags
    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for CodecFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

impl From<u8> for CodecFlags {
    fn from(value: u8) -> Self {
        Self::new(u32::from(value))
    }
}

impl From<u32> for CodecFlags {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}
