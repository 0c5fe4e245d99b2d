//! Classical Hamming code with parity bits at power-of-two positions

use crate::hamming::error::{HammingError, Result};
use crate::hamming::{BlockCode, BlockStatus, CorrectionScheme, MAX_CONTROL_BITS, MIN_CONTROL_BITS};
use bitvec::prelude::*;

/// Classical Hamming(2^r − 1, 2^r − 1 − r) code
///
/// Positions inside a block are 1-based. Parity bits sit at positions
/// `1, 2, 4, …, 2^(r−1)`; data bits fill the remaining positions in
/// ascending order. The syndrome column of a position is its own binary
/// value, so every non-zero r-bit syndrome names exactly one position.
///
/// This variant corrects any single-bit error per block but cannot detect
/// double errors: two flipped bits produce a non-zero syndrome that is
/// treated as a single error at the wrong position, so the block decodes
/// to corrupted data while reporting one correction. Use
/// [`ExtendedHammingCode`](crate::hamming::ExtendedHammingCode) when double
/// errors must be detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HammingCode {
    r: u8,
    n: usize,
    k: usize,
    parity_positions: Vec<usize>,
    data_positions: Vec<usize>,
    /// Syndrome column per position; index 0 unused
    columns: Vec<usize>,
    /// Inverse of `columns`; index 0 (no error) maps to `None`
    positions_by_syndrome: Vec<Option<usize>>,
}

impl HammingCode {
    /// Create a codec with `r` control bits (2..=10)
    pub fn new(r: u8) -> Result<Self> {
        if !(MIN_CONTROL_BITS..=MAX_CONTROL_BITS).contains(&r) {
            return Err(HammingError::InvalidControlBits(r));
        }

        let n = (1usize << r) - 1;
        let k = n - r as usize;
        let parity_positions: Vec<usize> = (0..r).map(|i| 1usize << i).collect();
        let data_positions: Vec<usize> = (1..=n).filter(|p| !p.is_power_of_two()).collect();

        let mut columns = vec![0usize; n + 1];
        let mut positions_by_syndrome = vec![None; n + 1];
        for (position, column) in columns.iter_mut().enumerate().skip(1) {
            // Bit i of the column is set when parity check 2^i covers this position
            *column = position;
            positions_by_syndrome[position] = Some(position);
        }

        Ok(Self {
            r,
            n,
            k,
            parity_positions,
            data_positions,
            columns,
            positions_by_syndrome,
        })
    }

    /// Parity-bit positions (1-based)
    pub fn parity_positions(&self) -> &[usize] {
        &self.parity_positions
    }

    /// Recompute the parity checks over an n-bit codeword
    pub(crate) fn syndrome(&self, codeword: &BitSlice<u8, Msb0>) -> usize {
        codeword
            .iter_ones()
            .fold(0, |syndrome, index| syndrome ^ self.columns[index + 1])
    }

    /// Position named by a non-zero syndrome
    pub(crate) fn position_for(&self, syndrome: usize) -> Option<usize> {
        self.positions_by_syndrome.get(syndrome).copied().flatten()
    }

    /// Append the data bits of an n-bit codeword to `out`
    pub(crate) fn extract_data(&self, codeword: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) {
        for &position in &self.data_positions {
            out.push(codeword[position - 1]);
        }
    }
}

impl BlockCode for HammingCode {
    fn scheme(&self) -> CorrectionScheme {
        CorrectionScheme::Classical
    }

    fn control_bits(&self) -> u8 {
        self.r
    }

    fn block_len(&self) -> usize {
        self.n
    }

    fn data_len(&self) -> usize {
        self.k
    }

    fn encode_block(&self, data: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) {
        debug_assert_eq!(data.len(), self.k);

        let mut codeword = bitvec![u8, Msb0; 0; self.n];
        for (&position, bit) in self.data_positions.iter().zip(data.iter().by_vals()) {
            codeword.set(position - 1, bit);
        }

        // Parity bits start at zero, and distinct powers of two never
        // overlap, so each check only sees data bits.
        for &check in &self.parity_positions {
            let parity = (1..=self.n)
                .filter(|position| position & check != 0)
                .fold(false, |acc, position| acc ^ codeword[position - 1]);
            codeword.set(check - 1, parity);
        }

        out.extend_from_bitslice(&codeword);
    }

    fn decode_block(&self, codeword: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) -> BlockStatus {
        debug_assert_eq!(codeword.len(), self.n);

        let syndrome = self.syndrome(codeword);
        if syndrome == 0 {
            self.extract_data(codeword, out);
            return BlockStatus::Clean;
        }

        match self.position_for(syndrome) {
            Some(position) => {
                let mut fixed = codeword.to_bitvec();
                let bit = fixed[position - 1];
                fixed.set(position - 1, !bit);
                self.extract_data(&fixed, out);
                BlockStatus::Corrected { position }
            }
            None => {
                self.extract_data(codeword, out);
                BlockStatus::Uncorrectable
            }
        }
    }
}
