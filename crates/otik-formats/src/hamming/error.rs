//! Error types for the Hamming codec

use thiserror::Error;

/// Hamming codec errors
#[derive(Debug, Error)]
pub enum HammingError {
    /// Control-bit parameter `r` outside the supported range
    #[error("Invalid Hamming parameter r={0}: must be between 2 and 10")]
    InvalidControlBits(u8),

    /// Declared padding exceeds the decoded data
    #[error("Padding {padding} exceeds decoded data of {available} bits")]
    InvalidPadding {
        /// Declared padding bits
        padding: usize,
        /// Decoded data bits before trimming
        available: usize,
    },
}

/// Result type for Hamming operations
pub type Result<T> = std::result::Result<T, HammingError>;
