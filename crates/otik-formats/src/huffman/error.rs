//! Error types for the Huffman codec

use thiserror::Error;

/// Huffman codec errors
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// Serialized code-length table has the wrong size
    #[error("Invalid code table size: expected {expected} bytes, got {actual}")]
    InvalidTableSize {
        /// Required size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// A code length exceeds what the decoder can represent
    #[error("Code length {length} for symbol {symbol:#04x} exceeds maximum 64")]
    CodeLengthTooLong {
        /// Offending symbol
        symbol: u8,
        /// Its code length
        length: u8,
    },

    /// Lengths violate the Kraft inequality (not a prefix code)
    #[error("Code length table is oversubscribed")]
    OversubscribedTable,

    /// Input contains a symbol the code table has no code for
    #[error("Symbol {0:#04x} has no code in the table")]
    MissingSymbol(u8),

    /// Bit stream contains a sequence that matches no code
    #[error("Invalid Huffman code at bit position {position}")]
    InvalidCode {
        /// Bit index where the unmatched code ends
        position: usize,
    },

    /// Requested more bits than the input holds
    #[error("Bit count {total_bits} exceeds available {available} bits")]
    BitCountOutOfRange {
        /// Requested bit count
        total_bits: usize,
        /// Bits present in the input
        available: usize,
    },

    /// Padding larger than the encoded stream
    #[error("Padding {padding} exceeds stream of {available} bits")]
    InvalidPadding {
        /// Declared padding bits
        padding: u8,
        /// Bits present in the input
        available: usize,
    },
}

/// Result type for Huffman operations
pub type Result<T> = std::result::Result<T, HuffmanError>;
