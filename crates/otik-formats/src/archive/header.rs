//! Archive meta region: 96-byte header followed by the 256-byte code table

use crate::OtikFormat;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::flags::CodecFlags;
use crate::archive::limits::FormatLimits;
use crate::archive::{
    BYTE_ORDER_OFFSET, FORMAT_VERSION, HEADER_CRC_RANGE, META_SIZE, RECORD_ALIGNMENT, SIGNATURE,
};
use crate::bits::CodeLengthTable;
use binrw::{BinRead, BinWrite, Endian};
use std::fmt;
use std::io::Cursor;

/// Byte order applied to every multi-byte integer in the header and records
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[brw(repr = u8)]
pub enum ByteOrder {
    /// Little-endian (selector 0)
    #[default]
    Little = 0,
    /// Big-endian (selector 1)
    Big = 1,
}

impl ByteOrder {
    /// Decode the selector byte
    pub fn from_selector(value: u8) -> ArchiveResult<Self> {
        match value {
            0 => Ok(Self::Little),
            1 => Ok(Self::Big),
            other => Err(ArchiveError::InvalidByteOrder(other)),
        }
    }

    /// Selector byte as stored
    pub const fn selector(self) -> u8 {
        self as u8
    }

    /// Matching binrw endianness
    pub const fn endian(self) -> Endian {
        match self {
            Self::Little => Endian::Little,
            Self::Big => Endian::Big,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little"),
            Self::Big => write!(f, "big"),
        }
    }
}

/// Archive header and archive-wide code table (352 bytes)
///
/// Fields are declared in on-disk order. The struct carries no fixed
/// endianness; [`ByteOrder::endian`] of the `byte_order` field is passed to
/// binrw at runtime.
///
/// ```text
/// 0x00  signature              [u8; 16]
/// 0x10  version                u32
/// 0x14  flags                  u32
/// 0x18  archive_size           u64
/// 0x20  data_crc32             u32
/// 0x24  header_crc32           u32
/// 0x28  byte_order             u8
/// 0x29  align                  u8
/// 0x2A  file_count             u32
/// 0x2E  data_section_offset    u64
/// 0x36  index_section_offset   u64
/// 0x3E  reserved               [u8; 34]
/// 0x60  code_table             [u8; 256]
/// ```
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Fixed archive signature
    pub signature: [u8; 16],
    /// Format version
    pub version: u32,
    /// Union of the entry flags plus requested checks
    pub flags: CodecFlags,
    /// Total archive size in bytes
    pub archive_size: u64,
    /// CRC32 of the data section
    pub data_crc32: u32,
    /// CRC32 of the meta region with this field zeroed
    pub header_crc32: u32,
    /// Byte order of every multi-byte integer
    pub byte_order: ByteOrder,
    /// Record alignment (informational)
    pub align: u8,
    /// Number of file-table records
    pub file_count: u32,
    /// Absolute offset of the first payload byte
    pub data_section_offset: u64,
    /// Absolute offset of the index section, 0 if absent
    pub index_section_offset: u64,
    /// Zero-filled
    pub reserved: [u8; 34],
    /// Archive-wide Huffman code lengths
    pub code_table: CodeLengthTable,
}

impl ArchiveHeader {
    /// Header for an empty archive
    pub fn new(byte_order: ByteOrder) -> Self {
        Self {
            signature: SIGNATURE,
            version: FORMAT_VERSION,
            flags: CodecFlags::default(),
            archive_size: META_SIZE as u64,
            data_crc32: crc32fast::hash(&[]),
            header_crc32: 0,
            byte_order,
            align: RECORD_ALIGNMENT as u8,
            file_count: 0,
            data_section_offset: META_SIZE as u64,
            index_section_offset: 0,
            reserved: [0; 34],
            code_table: CodeLengthTable::empty(),
        }
    }

    /// Read the byte-order selector without decoding anything else
    pub fn peek_byte_order(data: &[u8]) -> ArchiveResult<ByteOrder> {
        let selector = data
            .get(BYTE_ORDER_OFFSET)
            .copied()
            .ok_or(ArchiveError::TruncatedHeader {
                expected: META_SIZE,
                actual: data.len(),
            })?;
        ByteOrder::from_selector(selector)
    }

    /// Parse and validate a meta region with the default limits
    pub fn parse(data: &[u8]) -> ArchiveResult<Self> {
        Self::parse_with_limits(data, &FormatLimits::default())
    }

    /// Parse and validate a meta region
    ///
    /// The signature and byte-order selector are checked before any other
    /// field is decoded. The header checksum is not checked here; see
    /// [`validate_checksum`](Self::validate_checksum).
    pub fn parse_with_limits(data: &[u8], limits: &FormatLimits) -> ArchiveResult<Self> {
        if data.len() < META_SIZE {
            return Err(ArchiveError::TruncatedHeader {
                expected: META_SIZE,
                actual: data.len(),
            });
        }

        let mut signature = [0u8; 16];
        signature.copy_from_slice(&data[..16]);
        if signature != SIGNATURE {
            return Err(ArchiveError::InvalidSignature(signature));
        }

        let byte_order = Self::peek_byte_order(data)?;
        let mut cursor = Cursor::new(&data[..META_SIZE]);
        let header = Self::read_options(&mut cursor, byte_order.endian(), ())?;
        header.validate(limits)?;
        Ok(header)
    }

    /// Validate and serialize with the default limits
    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        self.to_bytes_with_limits(&FormatLimits::default())
    }

    /// Validate and serialize to exactly 352 bytes
    pub fn to_bytes_with_limits(&self, limits: &FormatLimits) -> ArchiveResult<Vec<u8>> {
        self.validate(limits)?;
        self.encode()
    }

    fn encode(&self) -> ArchiveResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(META_SIZE));
        self.write_options(&mut cursor, self.byte_order.endian(), ())?;
        Ok(cursor.into_inner())
    }

    /// CRC32 of a raw meta region with the checksum field treated as zero
    pub fn checksum_of(meta: &[u8]) -> u32 {
        let meta = &meta[..meta.len().min(META_SIZE)];
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&meta[..HEADER_CRC_RANGE.start.min(meta.len())]);
        if meta.len() >= HEADER_CRC_RANGE.end {
            hasher.update(&[0; 4]);
            hasher.update(&meta[HEADER_CRC_RANGE.end..]);
        }
        hasher.finalize()
    }

    /// Recompute the header checksum
    pub fn compute_checksum(&self) -> ArchiveResult<u32> {
        Ok(Self::checksum_of(&self.encode()?))
    }

    /// Fail if the stored header checksum is stale
    pub fn validate_checksum(&self) -> ArchiveResult<()> {
        let computed = self.compute_checksum()?;
        if computed != self.header_crc32 {
            return Err(ArchiveError::HeaderChecksumMismatch {
                stored: self.header_crc32,
                computed,
            });
        }
        Ok(())
    }

    /// Check every structural invariant of the header
    pub fn validate(&self, limits: &FormatLimits) -> ArchiveResult<()> {
        if self.signature != SIGNATURE {
            return Err(ArchiveError::InvalidSignature(self.signature));
        }

        if self.version != FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion(self.version));
        }

        if self.flags.unknown_bits() != 0 {
            return Err(ArchiveError::UnknownFlags(self.flags.unknown_bits()));
        }

        if self.reserved.iter().any(|&b| b != 0) {
            return Err(ArchiveError::NonZeroReserved);
        }

        if self.file_count > limits.max_files {
            return Err(ArchiveError::TooManyFiles {
                count: self.file_count,
                max: limits.max_files,
            });
        }

        let min = META_SIZE as u64;
        let max = limits.max_archive_size(self.file_count);
        if self.archive_size < min || self.archive_size > max {
            return Err(ArchiveError::InvalidArchiveSize {
                size: self.archive_size,
                min,
                max,
            });
        }

        if self.data_section_offset < min || self.data_section_offset > self.archive_size {
            return Err(ArchiveError::InvalidDataSectionOffset(
                self.data_section_offset,
            ));
        }

        if self.index_section_offset != 0
            && (self.index_section_offset < self.data_section_offset
                || self.index_section_offset > self.archive_size)
        {
            return Err(ArchiveError::InvalidIndexSectionOffset {
                index: self.index_section_offset,
                data: self.data_section_offset,
            });
        }

        if self.flags.has(CodecFlags::INDEX_TABLE) && self.index_section_offset == 0 {
            return Err(ArchiveError::MissingIndexSection);
        }

        self.code_table
            .validate()
            .map_err(ArchiveError::InvalidCodeTable)?;

        Ok(())
    }

    /// End of the data section: the index section if present, else end of file
    pub const fn data_section_end(&self) -> u64 {
        if self.index_section_offset != 0 {
            self.index_section_offset
        } else {
            self.archive_size
        }
    }

    /// Size of the data section in bytes
    pub const fn data_section_len(&self) -> u64 {
        self.data_section_end().saturating_sub(self.data_section_offset)
    }
}

impl Default for ArchiveHeader {
    fn default() -> Self {
        Self::new(ByteOrder::Little)
    }
}

impl OtikFormat for ArchiveHeader {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::parse(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        Ok(self.to_bytes()?)
    }
}
