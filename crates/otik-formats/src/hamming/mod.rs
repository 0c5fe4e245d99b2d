//! Systematic Hamming block codes for forward error correction
//!
//! A bit stream is cut into `k`-bit blocks, each expanded to an `n`-bit
//! codeword. The last block is zero-filled; the number of filler bits is
//! returned as `padding` and must be handed back to the decoder.
//!
//! Two schemes implement [`BlockCode`]:
//!
//! - [`HammingCode`] - classical `(2^r − 1, 2^r − 1 − r)`, single-error
//!   correction, no double-error detection
//! - [`ExtendedHammingCode`] - adds a global parity bit (`n = 2^r`) and
//!   reports double errors as uncorrectable
//!
//! ```rust
//! use otik_formats::hamming::{BlockCode, HammingCode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let code = HammingCode::new(4)?;
//! let packed = code.pack(b"hello");
//!
//! let mut damaged = packed.data.clone();
//! damaged[0] ^= 0x10;
//!
//! let unpacked = code.unpack(&damaged, packed.padding)?;
//! assert_eq!(unpacked.data, b"hello");
//! assert_eq!(unpacked.report.corrected, 1);
//! # Ok(())
//! # }
//! ```

pub mod code;
pub mod error;
pub mod extended;

pub use code::HammingCode;
pub use error::{HammingError, Result};
pub use extended::ExtendedHammingCode;

use crate::bits::{bits_to_bytes, bytes_to_bits};
use bitvec::prelude::*;
use std::fmt;
use tracing::warn;

/// Smallest supported number of control bits
pub const MIN_CONTROL_BITS: u8 = 2;
/// Largest supported number of control bits
pub const MAX_CONTROL_BITS: u8 = 10;

/// Which Hamming construction a codec uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CorrectionScheme {
    /// Single-error correction
    #[default]
    Classical,
    /// Single-error correction, double-error detection
    Extended,
}

impl fmt::Display for CorrectionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classical => write!(f, "hamming"),
            Self::Extended => write!(f, "hamming-secded"),
        }
    }
}

/// Outcome of decoding one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// Zero syndrome
    Clean,
    /// One bit flipped back at this 1-based position
    Corrected {
        /// Position of the repaired bit
        position: usize,
    },
    /// Error pattern detected but not repairable
    Uncorrectable,
}

/// Per-stream tally of block outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Blocks where a single bit was repaired
    pub corrected: usize,
    /// Blocks with a detected but unrepairable error
    pub uncorrectable: usize,
}

impl CorrectionReport {
    /// True when no block needed attention
    pub const fn is_clean(&self) -> bool {
        self.corrected == 0 && self.uncorrectable == 0
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: Self) {
        self.corrected += other.corrected;
        self.uncorrectable += other.uncorrectable;
    }

    fn record(&mut self, status: BlockStatus) {
        match status {
            BlockStatus::Clean => {}
            BlockStatus::Corrected { .. } => self.corrected += 1,
            BlockStatus::Uncorrectable => self.uncorrectable += 1,
        }
    }
}

/// Output of [`BlockCode::pack`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HammingPacked {
    /// Encoded codewords packed MSB-first
    pub data: Vec<u8>,
    /// Zero bits appended to complete the last data block
    pub padding: usize,
}

/// Output of [`BlockCode::unpack`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HammingUnpacked {
    /// Recovered data bytes
    pub data: Vec<u8>,
    /// Block outcomes
    pub report: CorrectionReport,
}

/// A systematic binary block code
pub trait BlockCode: fmt::Debug + Send + Sync {
    /// Construction used by this codec
    fn scheme(&self) -> CorrectionScheme;

    /// Control-bit parameter `r`
    fn control_bits(&self) -> u8;

    /// Codeword length `n`
    fn block_len(&self) -> usize;

    /// Data bits per block `k`
    fn data_len(&self) -> usize;

    /// Append the codeword for exactly `k` data bits to `out`
    fn encode_block(&self, data: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>);

    /// Append the `k` data bits of an `n`-bit codeword to `out`
    fn decode_block(&self, codeword: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) -> BlockStatus;

    /// Encode a bit stream, returning codewords and the filler bit count
    fn pack_bits(&self, bits: &BitSlice<u8, Msb0>) -> (BitVec<u8, Msb0>, usize) {
        let k = self.data_len();
        let blocks = bits.len().div_ceil(k);
        let padding = blocks * k - bits.len();

        let mut out = BitVec::with_capacity(blocks * self.block_len());
        let mut block = BitVec::<u8, Msb0>::with_capacity(k);
        for chunk in bits.chunks(k) {
            block.clear();
            block.extend_from_bitslice(chunk);
            block.resize(k, false);
            self.encode_block(&block, &mut out);
        }

        (out, padding)
    }

    /// Decode whole codewords and drop `padding` trailing data bits
    ///
    /// A trailing partial codeword is ignored.
    fn unpack_bits(
        &self,
        encoded: &BitSlice<u8, Msb0>,
        padding: usize,
    ) -> Result<(BitVec<u8, Msb0>, CorrectionReport)> {
        let n = self.block_len();
        let mut out = BitVec::with_capacity(encoded.len() / n * self.data_len());
        let mut report = CorrectionReport::default();

        for (index, codeword) in encoded.chunks_exact(n).enumerate() {
            let status = self.decode_block(codeword, &mut out);
            match status {
                BlockStatus::Corrected { position } => {
                    warn!(block = index, position, "corrected single-bit error");
                }
                BlockStatus::Uncorrectable => {
                    warn!(block = index, "uncorrectable error detected");
                }
                BlockStatus::Clean => {}
            }
            report.record(status);
        }

        let available = out.len();
        let keep = available
            .checked_sub(padding)
            .ok_or(HammingError::InvalidPadding { padding, available })?;
        out.truncate(keep);

        Ok((out, report))
    }

    /// Encode bytes
    fn pack(&self, data: &[u8]) -> HammingPacked {
        let (bits, padding) = self.pack_bits(bytes_to_bits(data));
        HammingPacked {
            data: bits_to_bytes(&bits),
            padding,
        }
    }

    /// Decode bytes produced by [`pack`](Self::pack)
    ///
    /// Only whole bytes are returned; leftover bits short of a byte are dropped.
    fn unpack(&self, data: &[u8], padding: usize) -> Result<HammingUnpacked> {
        let (bits, report) = self.unpack_bits(bytes_to_bits(data), padding)?;
        Ok(HammingUnpacked {
            data: bits_to_bytes(&bits[..bits.len() / 8 * 8]),
            report,
        })
    }
}

/// Build the codec for `scheme` with `r` control bits
pub fn codec(scheme: CorrectionScheme, r: u8) -> Result<Box<dyn BlockCode>> {
    Ok(match scheme {
        CorrectionScheme::Classical => Box::new(HammingCode::new(r)?),
        CorrectionScheme::Extended => Box::new(ExtendedHammingCode::new(r)?),
    })
}
