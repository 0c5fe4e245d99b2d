//! Error types for archive operations

use crate::huffman::HuffmanError;
use std::fmt;
use thiserror::Error;

/// Archive operation result type
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Broad error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Structurally unreadable bytes
    Format,
    /// A stored checksum disagrees with the data
    Integrity,
    /// A decoded field breaks a format invariant
    Validation,
    /// Writer capacity or consistency limit
    Capacity,
    /// Filesystem failure
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Format => "format",
            Self::Integrity => "integrity",
            Self::Validation => "validation",
            Self::Capacity => "capacity",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors raised while reading, writing or validating archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Meta region does not start with the archive signature
    #[error("Invalid archive signature: {0:02x?}")]
    InvalidSignature([u8; 16]),

    /// Fewer bytes than the fixed meta region
    #[error("Truncated meta region: expected {expected} bytes, got {actual}")]
    TruncatedHeader {
        /// Required size
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// File-table record tag mismatch
    #[error("Invalid record tag: 0x{0:08x}")]
    InvalidRecordTag(u32),

    /// Stream ended inside a structure
    #[error("Unexpected end of archive while reading {context}")]
    UnexpectedEof {
        /// What was being read
        context: &'static str,
    },

    /// Entry name is not UTF-8
    #[error("Entry name is not valid UTF-8")]
    InvalidName(#[source] std::string::FromUtf8Error),

    /// Stored header checksum disagrees with the meta region
    #[error("Header checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    HeaderChecksumMismatch {
        /// Value in the header
        stored: u32,
        /// Recomputed value
        computed: u32,
    },

    /// Entry payload checksum mismatch
    #[error("Payload checksum mismatch for '{name}': stored 0x{stored:08x}, computed 0x{computed:08x}")]
    PayloadChecksumMismatch {
        /// Entry name
        name: String,
        /// Value in the record
        stored: u32,
        /// Recomputed value
        computed: u32,
    },

    /// Data section checksum mismatch
    #[error("Data section checksum mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}")]
    DataChecksumMismatch {
        /// Value in the header
        stored: u32,
        /// Recomputed value
        computed: u32,
    },

    /// Header version is not the supported one
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// Byte-order selector is neither 0 nor 1
    #[error("Invalid byte order selector: {0}")]
    InvalidByteOrder(u8),

    /// Flag bits outside the defined set
    #[error("Unknown flag bits: 0x{0:08x}")]
    UnknownFlags(u32),

    /// Reserved header span is not zero-filled
    #[error("Reserved header bytes are not zero")]
    NonZeroReserved,

    /// `file_count` above the configured maximum
    #[error("Too many files: {count} exceeds maximum {max}")]
    TooManyFiles {
        /// Declared count
        count: u32,
        /// Configured maximum
        max: u32,
    },

    /// `data_section_offset` inside the meta region
    #[error("Invalid data section offset: {0}")]
    InvalidDataSectionOffset(u64),

    /// `index_section_offset` before the data section
    #[error("Invalid index section offset {index}: data section starts at {data}")]
    InvalidIndexSectionOffset {
        /// Declared index offset
        index: u64,
        /// Declared data offset
        data: u64,
    },

    /// Index-table flag set without an index section
    #[error("Index-table flag set but no index section is present")]
    MissingIndexSection,

    /// Entry index past the end of the file table
    #[error("Entry index {index} out of range: archive has {count} entries")]
    EntryOutOfRange {
        /// Requested index
        index: usize,
        /// Number of records
        count: usize,
    },

    /// `archive_size` outside the plausible range
    #[error("Invalid archive size {size}: expected {min}..={max}")]
    InvalidArchiveSize {
        /// Declared size
        size: u64,
        /// Meta region size
        min: u64,
        /// Worst case for the declared file count
        max: u64,
    },

    /// Archive code table is not a valid prefix code
    #[error("Invalid code table: {0}")]
    InvalidCodeTable(#[source] HuffmanError),

    /// Entry name exceeds the configured maximum
    #[error("Name too long: {len} bytes exceeds maximum {max}")]
    NameTooLong {
        /// Name length in bytes
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Entry size exceeds the configured maximum
    #[error("File too large: {size} bytes exceeds maximum {max}")]
    FileTooLarge {
        /// Offending size
        size: u64,
        /// Configured maximum
        max: u64,
    },

    /// Hamming parameter out of range
    #[error("Invalid control bits: {0}")]
    InvalidControlBits(u8),

    /// Pad-bit field above 7
    #[error("Invalid {field}: {value} (must be 0..=7)")]
    InvalidPadding {
        /// Which padding field
        field: &'static str,
        /// Stored value
        value: u8,
    },

    /// Original size implausibly large for the stored size
    #[error("Implausible compression ratio: {original} bytes from {compressed}")]
    ImplausibleRatio {
        /// Original size
        original: u32,
        /// Stored size
        compressed: u32,
    },

    /// Payload offset inconsistent with the payload size
    #[error("Invalid data offset {offset} for payload of {size} bytes")]
    InvalidDataOffset {
        /// Stored offset
        offset: u64,
        /// Stored size
        size: u32,
    },

    /// Writer already holds the maximum number of entries
    #[error("Archive capacity exceeded: at most {max} entries")]
    CapacityExceeded {
        /// Configured maximum
        max: u32,
    },

    /// Entry was Huffman-coded with a table other than the archive table
    #[error("Entry '{name}' uses a different code table than the archive")]
    CodeTableConflict {
        /// Entry name
        name: String,
    },

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Temporary archive could not be moved into place
    #[error("Failed to persist archive: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl ArchiveError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSignature(_)
            | Self::TruncatedHeader { .. }
            | Self::InvalidRecordTag(_)
            | Self::UnexpectedEof { .. }
            | Self::InvalidName(_)
            | Self::BinRw(_) => ErrorKind::Format,
            Self::HeaderChecksumMismatch { .. }
            | Self::PayloadChecksumMismatch { .. }
            | Self::DataChecksumMismatch { .. } => ErrorKind::Integrity,
            Self::UnsupportedVersion(_)
            | Self::InvalidByteOrder(_)
            | Self::UnknownFlags(_)
            | Self::NonZeroReserved
            | Self::TooManyFiles { .. }
            | Self::InvalidDataSectionOffset(_)
            | Self::InvalidIndexSectionOffset { .. }
            | Self::MissingIndexSection
            | Self::EntryOutOfRange { .. }
            | Self::InvalidArchiveSize { .. }
            | Self::InvalidCodeTable(_)
            | Self::NameTooLong { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidControlBits(_)
            | Self::InvalidPadding { .. }
            | Self::ImplausibleRatio { .. }
            | Self::InvalidDataOffset { .. } => ErrorKind::Validation,
            Self::CapacityExceeded { .. } | Self::CodeTableConflict { .. } => ErrorKind::Capacity,
            Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => ErrorKind::Format,
            Self::Io(_) | Self::Persist(_) => ErrorKind::Io,
        }
    }

    /// Check if this is a checksum failure
    pub fn is_integrity_error(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }

    /// Check if this is an invariant violation
    pub fn is_validation_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Check if the bytes were structurally unreadable
    pub fn is_format_error(&self) -> bool {
        self.kind() == ErrorKind::Format
    }

    /// Map an early EOF to [`ArchiveError::UnexpectedEof`]
    pub(crate) fn eof_as(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Self::UnexpectedEof { context }
            } else {
                Self::Io(e)
            }
        }
    }
}
