//! File-table records: 30-byte fixed prefix plus UTF-8 name

use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::flags::CodecFlags;
use crate::archive::header::ByteOrder;
use crate::archive::limits::{FormatLimits, align_up};
use crate::archive::{META_SIZE, RECORD_PREFIX_SIZE, RECORD_TAG};
use crate::hamming::{MAX_CONTROL_BITS, MIN_CONTROL_BITS};
use binrw::{BinRead, BinWrite};
use std::io::Cursor;

/// Fixed part of a file-table record, in on-disk order
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPrefix {
    /// Record tag, always [`RECORD_TAG`]
    pub tag: u32,
    /// CRC32 of the stored payload
    pub payload_crc32: u32,
    /// Size before encoding
    pub original_size: u32,
    /// Stored payload size
    pub compressed_size: u32,
    /// Absolute payload offset, 0 when empty
    pub data_offset: u64,
    /// Low byte of [`CodecFlags`]
    pub flags: u8,
    /// Hamming `r`, 0 when unused
    pub control_bits: u8,
    /// Huffman pad bits
    pub padding_huffman: u8,
    /// Hamming pad bits (modulo 8)
    pub padding_hamming: u8,
    /// Name length in bytes
    pub name_len: u16,
}

impl RecordPrefix {
    /// Decode the prefix, checking only the tag
    pub fn parse(data: &[u8], byte_order: ByteOrder) -> ArchiveResult<Self> {
        if data.len() < RECORD_PREFIX_SIZE {
            return Err(ArchiveError::UnexpectedEof {
                context: "record prefix",
            });
        }
        let prefix = Self::read_options(
            &mut Cursor::new(&data[..RECORD_PREFIX_SIZE]),
            byte_order.endian(),
            (),
        )?;
        if prefix.tag != RECORD_TAG {
            return Err(ArchiveError::InvalidRecordTag(prefix.tag));
        }
        Ok(prefix)
    }
}

/// One archived entry's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTableRecord {
    /// Entry name
    pub name: String,
    /// CRC32 of the stored payload bytes
    pub payload_crc32: u32,
    /// Size before encoding
    pub original_size: u32,
    /// Stored payload size (0 means no payload)
    pub compressed_size: u32,
    /// Absolute payload offset
    pub data_offset: u64,
    /// Transforms applied to this entry
    pub flags: CodecFlags,
    /// Hamming `r`, 0 when unused
    pub control_bits: u8,
    /// Huffman pad bits (0..=7)
    pub padding_huffman: u8,
    /// Hamming pad bits modulo 8 (0..=7)
    pub padding_hamming: u8,
}

impl FileTableRecord {
    /// Serialized size without alignment
    pub fn serialized_len(&self) -> usize {
        RECORD_PREFIX_SIZE + self.name.len()
    }

    /// Serialized size including the pad to the next 8-byte boundary
    pub fn padded_len(&self) -> usize {
        align_up(self.serialized_len() as u64) as usize
    }

    /// Check record-level invariants
    pub fn validate(&self, limits: &FormatLimits) -> ArchiveResult<()> {
        let name_max = limits.max_name_len.min(u16::MAX as usize);
        if self.name.len() > name_max {
            return Err(ArchiveError::NameTooLong {
                len: self.name.len(),
                max: name_max,
            });
        }

        for size in [self.original_size, self.compressed_size] {
            if u64::from(size) > limits.max_file_size {
                return Err(ArchiveError::FileTooLarge {
                    size: u64::from(size),
                    max: limits.max_file_size,
                });
            }
        }

        if self.flags.unknown_bits() != 0 {
            return Err(ArchiveError::UnknownFlags(self.flags.unknown_bits()));
        }

        if self.flags.has(CodecFlags::HAMMING) {
            if !(MIN_CONTROL_BITS..=MAX_CONTROL_BITS).contains(&self.control_bits) {
                return Err(ArchiveError::InvalidControlBits(self.control_bits));
            }
        } else if self.control_bits != 0 {
            return Err(ArchiveError::InvalidControlBits(self.control_bits));
        }

        for (field, value) in [
            ("padding_huffman", self.padding_huffman),
            ("padding_hamming", self.padding_hamming),
        ] {
            if value > 7 {
                return Err(ArchiveError::InvalidPadding { field, value });
            }
        }

        if self.compressed_size == 0 {
            if self.original_size != 0 {
                return Err(ArchiveError::ImplausibleRatio {
                    original: self.original_size,
                    compressed: 0,
                });
            }
            if self.data_offset != 0 {
                return Err(ArchiveError::InvalidDataOffset {
                    offset: self.data_offset,
                    size: 0,
                });
            }
        } else {
            let ratio = u64::from(self.original_size / self.compressed_size);
            if ratio > limits.max_compression_ratio {
                return Err(ArchiveError::ImplausibleRatio {
                    original: self.original_size,
                    compressed: self.compressed_size,
                });
            }
            if self.data_offset < META_SIZE as u64 {
                return Err(ArchiveError::InvalidDataOffset {
                    offset: self.data_offset,
                    size: self.compressed_size,
                });
            }
        }

        Ok(())
    }

    /// Validate with the default limits and serialize
    pub fn serialize(&self, byte_order: ByteOrder) -> ArchiveResult<Vec<u8>> {
        self.serialize_with_limits(byte_order, &FormatLimits::default())
    }

    /// Validate and serialize prefix plus name
    ///
    /// The trailing alignment pad is not included.
    pub fn serialize_with_limits(
        &self,
        byte_order: ByteOrder,
        limits: &FormatLimits,
    ) -> ArchiveResult<Vec<u8>> {
        self.validate(limits)?;

        let prefix = RecordPrefix {
            tag: RECORD_TAG,
            payload_crc32: self.payload_crc32,
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            data_offset: self.data_offset,
            flags: self.flags.to_record_byte(),
            control_bits: self.control_bits,
            padding_huffman: self.padding_huffman,
            padding_hamming: self.padding_hamming,
            name_len: self.name.len() as u16,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(self.serialized_len()));
        prefix.write_options(&mut cursor, byte_order.endian(), ())?;
        let mut out = cursor.into_inner();
        out.extend_from_slice(self.name.as_bytes());
        Ok(out)
    }

    /// Parse with the default limits
    pub fn parse(prefix: &[u8], name: &[u8], byte_order: ByteOrder) -> ArchiveResult<Self> {
        Self::parse_with_limits(prefix, name, byte_order, &FormatLimits::default())
    }

    /// Parse a record from its prefix bytes and name bytes, then validate
    pub fn parse_with_limits(
        prefix: &[u8],
        name: &[u8],
        byte_order: ByteOrder,
        limits: &FormatLimits,
    ) -> ArchiveResult<Self> {
        let prefix = RecordPrefix::parse(prefix, byte_order)?;
        Self::from_prefix(prefix, name, limits)
    }

    pub(crate) fn from_prefix(
        prefix: RecordPrefix,
        name: &[u8],
        limits: &FormatLimits,
    ) -> ArchiveResult<Self> {
        if name.len() != prefix.name_len as usize {
            return Err(ArchiveError::UnexpectedEof {
                context: "record name",
            });
        }
        let name = String::from_utf8(name.to_vec()).map_err(ArchiveError::InvalidName)?;

        let record = Self {
            name,
            payload_crc32: prefix.payload_crc32,
            original_size: prefix.original_size,
            compressed_size: prefix.compressed_size,
            data_offset: prefix.data_offset,
            flags: CodecFlags::from(prefix.flags),
            control_bits: prefix.control_bits,
            padding_huffman: prefix.padding_huffman,
            padding_hamming: prefix.padding_hamming,
        };
        record.validate(limits)?;
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record() -> FileTableRecord {
        FileTableRecord {
            name: "notes.txt".to_string(),
            payload_crc32: 0xcafe_babe,
            original_size: 1000,
            compressed_size: 700,
            data_offset: 392,
            flags: CodecFlags::new(CodecFlags::HUFFMAN | CodecFlags::HAMMING),
            control_bits: 4,
            padding_huffman: 3,
            padding_hamming: 5,
        }
    }

    #[test]
    fn test_serialized_layout_little_endian() {
        let record = sample_record();
        let bytes = record.serialize(ByteOrder::Little).expect("serialize");

        assert_eq!(bytes.len(), 39);
        assert_eq!(record.padded_len(), 40);
        assert_eq!(&bytes[0..4], &[0x50, 0x4b, 0x03, 0x04]);
        assert_eq!(&bytes[4..8], &0xcafe_babeu32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1000u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &700u32.to_le_bytes());
        assert_eq!(&bytes[16..24], &392u64.to_le_bytes());
        assert_eq!(&bytes[24..28], &[0x03, 4, 3, 5]);
        assert_eq!(&bytes[28..30], &9u16.to_le_bytes());
        assert_eq!(&bytes[30..], b"notes.txt");
    }

    #[test]
    fn test_round_trip_both_orders() {
        let record = sample_record();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let bytes = record.serialize(order).expect("serialize");
            let (prefix, name) = bytes.split_at(RECORD_PREFIX_SIZE);
            let parsed = FileTableRecord::parse(prefix, name, order).expect("parse");
            assert_eq!(parsed, record);
        }
    }

    #[test]
    fn test_big_endian_tag() {
        let bytes = sample_record().serialize(ByteOrder::Big).expect("serialize");
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x4b, 0x50]);
    }

    #[test]
    fn test_parse_rejects_bad_tag() {
        let mut bytes = sample_record().serialize(ByteOrder::Little).expect("serialize");
        bytes[0] ^= 0xFF;
        let (prefix, name) = bytes.split_at(RECORD_PREFIX_SIZE);
        let err = FileTableRecord::parse(prefix, name, ByteOrder::Little).expect_err("bad tag");
        assert!(matches!(err, ArchiveError::InvalidRecordTag(_)));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_empty_payload_rules() {
        let mut record = sample_record();
        record.original_size = 0;
        record.compressed_size = 0;
        record.data_offset = 0;
        assert!(record.validate(&FormatLimits::default()).is_ok());

        record.data_offset = 400;
        assert!(matches!(
            record.validate(&FormatLimits::default()),
            Err(ArchiveError::InvalidDataOffset { .. })
        ));

        record.data_offset = 0;
        record.original_size = 5;
        assert!(matches!(
            record.validate(&FormatLimits::default()),
            Err(ArchiveError::ImplausibleRatio { .. })
        ));
    }

    #[test]
    fn test_validation_rules() {
        let limits = FormatLimits::default();

        let mut r = sample_record();
        r.name = "x".repeat(256);
        assert!(matches!(r.validate(&limits), Err(ArchiveError::NameTooLong { .. })));

        let mut r = sample_record();
        r.control_bits = 11;
        assert!(matches!(r.validate(&limits), Err(ArchiveError::InvalidControlBits(11))));

        let mut r = sample_record();
        r.flags.clear(CodecFlags::HAMMING);
        assert!(matches!(r.validate(&limits), Err(ArchiveError::InvalidControlBits(4))));

        let mut r = sample_record();
        r.padding_hamming = 8;
        assert!(matches!(
            r.validate(&limits),
            Err(ArchiveError::InvalidPadding {
                field: "padding_hamming",
                value: 8
            })
        ));

        let mut r = sample_record();
        r.data_offset = 100;
        assert!(matches!(r.validate(&limits), Err(ArchiveError::InvalidDataOffset { .. })));

        let mut r = sample_record();
        r.flags.set(0x100);
        assert!(matches!(r.validate(&limits), Err(ArchiveError::UnknownFlags(_))));
    }

    #[test]
    fn test_compression_ratio_guard() {
        let limits = FormatLimits::default();
        let mut r = sample_record();
        r.compressed_size = 1;
        r.original_size = 1000;
        assert!(r.validate(&limits).is_ok());

        r.original_size = 2000;
        assert!(matches!(r.validate(&limits), Err(ArchiveError::ImplausibleRatio { .. })));
    }

    #[test]
    fn test_size_limits() {
        let limits = FormatLimits {
            max_file_size: 500,
            ..FormatLimits::default()
        };
        let err = sample_record().validate(&limits).expect_err("too large");
        assert!(matches!(err, ArchiveError::FileTooLarge { size: 1000, max: 500 }));
    }

    #[test]
    fn test_prefix_requires_full_length() {
        assert!(matches!(
            RecordPrefix::parse(&[0u8; 10], ByteOrder::Little),
            Err(ArchiveError::UnexpectedEof { .. })
        ));
    }
}
