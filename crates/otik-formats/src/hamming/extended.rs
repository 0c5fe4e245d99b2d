//! Extended Hamming code (SECDED) with a trailing global parity bit

use crate::hamming::code::HammingCode;
use crate::hamming::error::Result;
use crate::hamming::{BlockCode, BlockStatus, CorrectionScheme};
use bitvec::prelude::*;

/// Classical Hamming codeword followed by one global parity bit
///
/// Block length is `2^r`, data length is the same as the classical code.
/// Decoding distinguishes four cases:
///
/// | Syndrome | Global parity | Meaning                                 |
/// |----------|---------------|-----------------------------------------|
/// | 0        | ok            | no error                                |
/// | ≠ 0      | wrong         | single error, corrected                 |
/// | 0        | wrong         | global parity bit flipped, data intact  |
/// | ≠ 0      | ok            | double error, detected, not corrected   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedHammingCode {
    inner: HammingCode,
}

impl ExtendedHammingCode {
    /// Create a SECDED codec with `r` control bits (2..=10)
    pub fn new(r: u8) -> Result<Self> {
        Ok(Self {
            inner: HammingCode::new(r)?,
        })
    }
}

impl BlockCode for ExtendedHammingCode {
    fn scheme(&self) -> CorrectionScheme {
        CorrectionScheme::Extended
    }

    fn control_bits(&self) -> u8 {
        self.inner.control_bits()
    }

    fn block_len(&self) -> usize {
        self.inner.block_len() + 1
    }

    fn data_len(&self) -> usize {
        self.inner.data_len()
    }

    fn encode_block(&self, data: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) {
        let start = out.len();
        self.inner.encode_block(data, out);
        let parity = out[start..].count_ones() % 2 == 1;
        out.push(parity);
    }

    fn decode_block(&self, codeword: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) -> BlockStatus {
        let n = self.inner.block_len();
        let body = &codeword[..n];
        let syndrome = self.inner.syndrome(body);
        let parity_error = codeword.count_ones() % 2 == 1;

        match (syndrome, parity_error) {
            (0, false) => {
                self.inner.extract_data(body, out);
                BlockStatus::Clean
            }
            (0, true) => {
                self.inner.extract_data(body, out);
                BlockStatus::Corrected { position: n + 1 }
            }
            (_, true) => match self.inner.position_for(syndrome) {
                Some(position) => {
                    let mut fixed = body.to_bitvec();
                    let bit = fixed[position - 1];
                    fixed.set(position - 1, !bit);
                    self.inner.extract_data(&fixed, out);
                    BlockStatus::Corrected { position }
                }
                None => {
                    self.inner.extract_data(body, out);
                    BlockStatus::Uncorrectable
                }
            },
            (_, false) => {
                self.inner.extract_data(body, out);
                BlockStatus::Uncorrectable
            }
        }
    }
}
