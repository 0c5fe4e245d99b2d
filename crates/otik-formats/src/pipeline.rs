//! Encode/decode pipeline between raw files and archive entries
//!
//! Encoding applies Huffman first and Hamming second; decoding reverses
//! the order and finally truncates to `original_size`.

use crate::archive::{
    ArchiveError, ArchiveSummary, ArchiveWriter, ByteOrder, CodecFlags, FileTableRecord,
    FormatLimits, PendingEntry,
};
use crate::bits::CodeLengthTable;
use crate::hamming::{self, BlockCode, CorrectionReport, CorrectionScheme, HammingError};
use crate::huffman::{self, HuffmanError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Huffman stage failed
    #[error("Huffman error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Hamming stage failed
    #[error("Hamming error: {0}")]
    Hamming(#[from] HammingError),

    /// Archive read or write failed
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Input does not fit a 32-bit size field
    #[error("Input too large: {0} bytes")]
    InputTooLarge(usize),

    /// Decoding produced fewer bytes than the recorded original size
    #[error("Decoded {actual} bytes for '{name}', expected {expected}")]
    ShortOutput {
        /// Entry name
        name: String,
        /// Recorded original size
        expected: u32,
        /// Bytes produced
        actual: usize,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Hamming stage settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HammingOptions {
    /// Control bits `r`
    pub control_bits: u8,
    /// Code construction
    pub scheme: CorrectionScheme,
}

impl HammingOptions {
    /// Classical Hamming with `r` control bits
    pub const fn classical(control_bits: u8) -> Self {
        Self {
            control_bits,
            scheme: CorrectionScheme::Classical,
        }
    }

    /// SECDED Hamming with `r` control bits
    pub const fn extended(control_bits: u8) -> Self {
        Self {
            control_bits,
            scheme: CorrectionScheme::Extended,
        }
    }

    /// Build the codec
    pub fn codec(&self) -> Result<Box<dyn BlockCode>, HammingError> {
        hamming::codec(self.scheme, self.control_bits)
    }
}

/// Which transforms to apply to an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Apply canonical Huffman coding
    pub huffman: bool,
    /// Apply Hamming coding
    pub hamming: Option<HammingOptions>,
}

impl EncodeOptions {
    /// No transforms
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable Huffman
    pub fn huffman(mut self, enabled: bool) -> Self {
        self.huffman = enabled;
        self
    }

    /// Set Hamming options, `None` to disable
    pub fn hamming(mut self, options: Option<HammingOptions>) -> Self {
        self.hamming = options;
        self
    }

    /// Entry flags these options produce
    pub fn flags(&self) -> CodecFlags {
        let mut flags = CodecFlags::default();
        flags.toggle(CodecFlags::HUFFMAN, self.huffman);
        if let Some(hamming) = self.hamming {
            flags.set(CodecFlags::HAMMING);
            flags.toggle(
                CodecFlags::HAMMING_SECDED,
                hamming.scheme == CorrectionScheme::Extended,
            );
        }
        flags
    }
}

/// Encoded payload plus the record fields describing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    /// Stored payload
    pub payload: Vec<u8>,
    /// Input size
    pub original_size: u32,
    /// Transforms applied
    pub flags: CodecFlags,
    /// Hamming `r`, 0 when unused
    pub control_bits: u8,
    /// Huffman pad bits
    pub padding_huffman: u8,
    /// Hamming block pad modulo 8
    pub padding_hamming: u8,
    /// Huffman code table, all zero when unused
    pub code_table: CodeLengthTable,
}

impl EncodedFile {
    /// Turn into a writer entry named `name`
    pub fn into_entry(self, name: impl Into<String>) -> PendingEntry {
        let code_table = self
            .flags
            .has(CodecFlags::HUFFMAN)
            .then_some(self.code_table);
        PendingEntry {
            name: name.into(),
            payload: self.payload,
            original_size: self.original_size,
            flags: self.flags,
            control_bits: self.control_bits,
            padding_huffman: self.padding_huffman,
            padding_hamming: self.padding_hamming,
            code_table,
        }
    }
}

/// Decoded entry contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    /// Original bytes
    pub data: Vec<u8>,
    /// Hamming outcome, all zero when Hamming was not applied
    pub report: CorrectionReport,
}

/// Encode `data` with a Huffman table derived from `data` itself
pub fn encode_file(data: &[u8], options: &EncodeOptions) -> PipelineResult<EncodedFile> {
    let table = if options.huffman {
        huffman::code_lengths(&huffman::count_frequencies(data))
    } else {
        CodeLengthTable::empty()
    };
    encode_file_with_table(data, options, &table)
}

/// Encode `data`, Huffman-coding with `table` when enabled
pub fn encode_file_with_table(
    data: &[u8],
    options: &EncodeOptions,
    table: &CodeLengthTable,
) -> PipelineResult<EncodedFile> {
    let original_size =
        u32::try_from(data.len()).map_err(|_| PipelineError::InputTooLarge(data.len()))?;

    let (stage, code_table, padding_huffman) = if options.huffman {
        let packed = huffman::pack_with_table(data, table)?;
        (packed.data, packed.lengths, packed.padding)
    } else {
        (data.to_vec(), CodeLengthTable::empty(), 0)
    };

    let (payload, control_bits, padding_hamming) = match options.hamming {
        Some(hamming) => {
            let packed = hamming.codec()?.pack(&stage);
            // Whole zero bytes of block pad are dropped by the final truncation
            (packed.data, hamming.control_bits, (packed.padding % 8) as u8)
        }
        None => (stage, 0, 0),
    };

    debug!(
        original_size,
        stored_size = payload.len(),
        flags = %options.flags(),
        "encoded file"
    );

    Ok(EncodedFile {
        payload,
        original_size,
        flags: options.flags(),
        control_bits,
        padding_huffman,
        padding_hamming,
        code_table,
    })
}

/// Decode a stored payload back to the original bytes
///
/// `code_table` is the archive-wide table from the header.
pub fn decode_entry(
    record: &FileTableRecord,
    payload: &[u8],
    code_table: &CodeLengthTable,
) -> PipelineResult<DecodedFile> {
    let mut report = CorrectionReport::default();
    let original_size = record.original_size as usize;

    let mut data = if record.flags.has(CodecFlags::HAMMING) {
        let scheme = if record.flags.has(CodecFlags::HAMMING_SECDED) {
            CorrectionScheme::Extended
        } else {
            CorrectionScheme::Classical
        };
        let unpacked = hamming::codec(scheme, record.control_bits)?
            .unpack(payload, usize::from(record.padding_hamming))?;
        report = unpacked.report;
        if report.uncorrectable > 0 {
            warn!(
                name = %record.name,
                blocks = report.uncorrectable,
                "entry has uncorrectable blocks"
            );
        }
        unpacked.data
    } else {
        payload.to_vec()
    };

    if record.flags.has(CodecFlags::HUFFMAN) {
        let available = data.len() * 8;
        let padding = record.padding_huffman;
        let total_bits = available
            .checked_sub(usize::from(padding))
            .ok_or(HuffmanError::InvalidPadding { padding, available })?;
        data = huffman::unpack_limited(&data, code_table, total_bits, original_size)?;
    }

    if data.len() < original_size {
        return Err(PipelineError::ShortOutput {
            name: record.name.clone(),
            expected: record.original_size,
            actual: data.len(),
        });
    }
    data.truncate(original_size);

    debug!(name = %record.name, bytes = data.len(), corrected = report.corrected, "decoded entry");
    Ok(DecodedFile { data, report })
}

/// Collects files and writes them as one archive
///
/// Every entry that requests Huffman is coded with one table built from
/// the combined byte frequencies of all such entries, since the archive
/// stores a single code table.
#[derive(Debug)]
pub struct ArchivePacker {
    writer: ArchiveWriter,
    limits: FormatLimits,
    pending: Vec<(String, Vec<u8>, EncodeOptions)>,
}

impl ArchivePacker {
    /// Create a packer writing to `path`
    pub fn new(path: impl Into<PathBuf>, byte_order: ByteOrder) -> Self {
        Self {
            writer: ArchiveWriter::new(path, byte_order),
            limits: FormatLimits::default(),
            pending: Vec::new(),
        }
    }

    /// Replace the validation limits
    pub fn with_limits(mut self, limits: FormatLimits) -> Self {
        self.writer = self.writer.with_limits(limits);
        self.limits = limits;
        self
    }

    /// Request archive-level flags such as [`CodecFlags::SHA256`]
    pub fn set_flags(&mut self, flags: u32) {
        self.writer.set_flags(flags);
    }

    /// Number of queued files
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue a file
    ///
    /// Limits and codec parameters are checked now so that a bad input
    /// fails before any encoding work.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
        options: EncodeOptions,
    ) -> PipelineResult<()> {
        let name = name.into();

        if self.pending.len() >= self.limits.max_files as usize {
            return Err(ArchiveError::CapacityExceeded {
                max: self.limits.max_files,
            }
            .into());
        }
        if name.len() > self.limits.max_name_len {
            return Err(ArchiveError::NameTooLong {
                len: name.len(),
                max: self.limits.max_name_len,
            }
            .into());
        }
        if data.len() as u64 > self.limits.max_file_size {
            return Err(ArchiveError::FileTooLarge {
                size: data.len() as u64,
                max: self.limits.max_file_size,
            }
            .into());
        }
        if let Some(hamming) = options.hamming {
            hamming.codec()?;
        }

        self.pending.push((name, data, options));
        Ok(())
    }

    /// Encode every queued file and write the archive
    pub fn finish(mut self) -> PipelineResult<ArchiveSummary> {
        let mut frequencies = [0u64; 256];
        for (_, data, options) in &self.pending {
            if options.huffman {
                huffman::accumulate_frequencies(&mut frequencies, data);
            }
        }
        let table = huffman::code_lengths(&frequencies);

        for (name, data, options) in std::mem::take(&mut self.pending) {
            let encoded = encode_file_with_table(&data, &options, &table)?;
            self.writer.add_entry(encoded.into_entry(name))?;
        }

        Ok(self.writer.finalize()?)
    }
}
