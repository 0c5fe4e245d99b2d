//! OTIK archive container
//!
//! # Layout
//!
//! ```text
//! +----------------------+ 0
//! | header (96 bytes)    |
//! | code table (256)     |
//! +----------------------+ 352  (meta region)
//! | file table           |  records, each padded to 8 bytes
//! +----------------------+ data_section_offset
//! | data section         |  payloads in record order
//! +----------------------+ index_section_offset or archive_size
//! | index (optional)     |
//! +----------------------+
//! ```
//!
//! A single byte-order selector at offset 40 decides the endianness of
//! every multi-byte integer in the header and in every record.
//!
//! # Checksums
//!
//! - `header_crc32`: CRC32 of the meta region with the field itself zeroed
//! - `data_crc32`: CRC32 of the data section
//! - per-record `payload_crc32`: CRC32 of that entry's stored bytes
//!
//! Headers and records are validated before any checksum or payload work,
//! so a corrupt header never leads to decoding garbage.

pub mod error;
pub mod flags;
pub mod header;
pub mod layout;
pub mod limits;
pub mod reader;
pub mod record;
pub mod writer;

pub use error::{ArchiveError, ArchiveResult, ErrorKind};
pub use flags::CodecFlags;
pub use header::{ArchiveHeader, ByteOrder};
pub use layout::{ArchiveLayout, EntryPlacement};
pub use limits::FormatLimits;
pub use reader::{ArchiveEntry, ArchiveReader, Entries};
pub use record::{FileTableRecord, RecordPrefix};
pub use writer::{ArchiveSummary, ArchiveWriter, EntrySummary, PendingEntry};

use std::ops::Range;

/// Archive signature
pub const SIGNATURE: [u8; 16] = *b"DBP-OTIK-HFHM\0\0\0";

/// Supported format version
pub const FORMAT_VERSION: u32 = 1;

/// Fixed header size before the code table
pub const HEADER_SIZE: usize = 96;

/// Header plus code table
pub const META_SIZE: usize = HEADER_SIZE + crate::bits::CODE_TABLE_SIZE;

/// Offset of the byte-order selector
pub const BYTE_ORDER_OFFSET: usize = 40;

/// Bytes of `header_crc32` inside the meta region
pub const HEADER_CRC_RANGE: Range<usize> = 36..40;

/// File-table record tag
pub const RECORD_TAG: u32 = 0x0403_4b50;

/// Fixed record prefix size
pub const RECORD_PREFIX_SIZE: usize = 30;

/// Record alignment within the file table
pub const RECORD_ALIGNMENT: usize = 8;
