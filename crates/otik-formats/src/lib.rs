//! OTIK archive container with canonical Huffman and Hamming codecs
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
//! This crate implements the three tightly coupled pieces of the OTIK archiver:
//!
//! - **Archive**: the binary container (352-byte meta region, 8-byte aligned
//!   file table, contiguous data section), its CRC32 checksums and the
//!   crash-safe write path
//! - **Huffman**: canonical Huffman entropy coder with a 256-entry
//!   code-length table
//! - **Hamming**: systematic Hamming forward error correction with
//!   single-bit correction per block
//!
//! The [`pipeline`] module glues them together:
//!
//! ```text
//! raw bytes → Huffman → Hamming → archive entry
//! archive entry → Hamming⁻¹ → Huffman⁻¹ → truncate(original_size)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use otik_formats::archive::ByteOrder;
//! use otik_formats::pipeline::{ArchivePacker, EncodeOptions, HammingOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = EncodeOptions::new()
//!     .huffman(true)
//!     .hamming(Some(HammingOptions::classical(4)));
//!
//! let mut packer = ArchivePacker::new("out/data.otik", ByteOrder::Little);
//! packer.add("hello.txt", b"hello hello hello".to_vec(), options)?;
//! let summary = packer.finish()?;
//! println!("wrote {} bytes", summary.archive_size);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Archive container: header, file table, writer and reader
///
/// See the [`archive`] module for the on-disk layout and the
/// validation rules applied on both write and read.
pub mod archive;
/// Byte/bit conversion helpers and the 256-entry code-length table
pub mod bits;
/// Systematic Hamming forward error correction
pub mod hamming;
/// Canonical Huffman entropy coder
pub mod huffman;
/// Encode/decode pipeline joining the codecs to archive entries
pub mod pipeline;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

/// Common trait for the fixed-layout structures of the format
pub trait OtikFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>>;

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            return Err("Round-trip verification failed".into());
        }
        Ok(())
    }
}
