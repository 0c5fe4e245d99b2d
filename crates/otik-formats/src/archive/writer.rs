//! Crash-safe archive writer

use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::flags::CodecFlags;
use crate::archive::header::{ArchiveHeader, ByteOrder};
use crate::archive::layout::ArchiveLayout;
use crate::archive::limits::FormatLimits;
use crate::archive::record::FileTableRecord;
use crate::archive::META_SIZE;
use crate::bits::CodeLengthTable;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An encoded entry waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    /// Entry name
    pub name: String,
    /// Stored payload bytes
    pub payload: Vec<u8>,
    /// Size before encoding
    pub original_size: u32,
    /// Transforms applied
    pub flags: CodecFlags,
    /// Hamming `r`, 0 when unused
    pub control_bits: u8,
    /// Huffman pad bits
    pub padding_huffman: u8,
    /// Hamming pad bits modulo 8
    pub padding_hamming: u8,
    /// Code table the payload was Huffman-coded with
    pub code_table: Option<CodeLengthTable>,
}

/// Result of a successful [`ArchiveWriter::finalize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Destination path
    pub path: PathBuf,
    /// Bytes written
    pub archive_size: u64,
    /// Entries written
    pub file_count: u32,
    /// Data section checksum
    pub data_crc32: u32,
    /// Header checksum
    pub header_crc32: u32,
    /// Per-entry sizes in archive order
    pub entries: Vec<EntrySummary>,
}

/// Sizes of one written entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    /// Entry name
    pub name: String,
    /// Size before encoding
    pub original_size: u32,
    /// Stored payload size
    pub stored_size: u32,
    /// Transforms applied
    pub flags: CodecFlags,
}

impl EntrySummary {
    /// `stored / original`, or 1.0 for empty entries
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            f64::from(self.stored_size) / f64::from(self.original_size)
        }
    }
}

/// Collects entries and writes them as one archive
///
/// The layout is computed once from the entry list, then the archive is
/// written once to a temporary file in the destination directory, synced,
/// and renamed over the destination. Readers of the destination path see
/// either the previous file or the complete new one.
///
/// There is no locking. Only one writer may target a given path at a time;
/// with two concurrent writers the last rename wins.
#[derive(Debug)]
pub struct ArchiveWriter {
    path: PathBuf,
    byte_order: ByteOrder,
    flags: CodecFlags,
    code_table: Option<CodeLengthTable>,
    limits: FormatLimits,
    entries: Vec<(FileTableRecord, Vec<u8>)>,
}

struct Assembled {
    header: ArchiveHeader,
    head: Vec<u8>,
}

impl ArchiveWriter {
    /// Create a writer for `path`
    pub fn new(path: impl Into<PathBuf>, byte_order: ByteOrder) -> Self {
        Self {
            path: path.into(),
            byte_order,
            flags: CodecFlags::default(),
            code_table: None,
            limits: FormatLimits::default(),
            entries: Vec::new(),
        }
    }

    /// Replace the validation limits
    pub fn with_limits(mut self, limits: FormatLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Request archive-level flags such as [`CodecFlags::SHA256`]
    ///
    /// Entry flags are merged in at finalize time, and [`CodecFlags::CRC32`]
    /// is always set since every archive carries its CRC32 fields.
    pub fn set_flags(&mut self, flags: u32) {
        self.flags.set(flags);
    }

    /// Fix the archive-wide code table
    pub fn set_code_table(&mut self, table: CodeLengthTable) -> ArchiveResult<()> {
        table.validate().map_err(ArchiveError::InvalidCodeTable)?;
        self.code_table = Some(table);
        Ok(())
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries added so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry has been added
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry
    ///
    /// Record invariants are checked here, before anything is written.
    pub fn add_entry(&mut self, entry: PendingEntry) -> ArchiveResult<()> {
        if self.entries.len() >= self.limits.max_files as usize {
            return Err(ArchiveError::CapacityExceeded {
                max: self.limits.max_files,
            });
        }

        let compressed_size =
            u32::try_from(entry.payload.len()).map_err(|_| ArchiveError::FileTooLarge {
                size: entry.payload.len() as u64,
                max: self.limits.max_file_size,
            })?;

        if entry.flags.has(CodecFlags::HUFFMAN) {
            let table = entry
                .code_table
                .as_ref()
                .ok_or_else(|| ArchiveError::CodeTableConflict {
                    name: entry.name.clone(),
                })?;
            if let Some(archive_table) = &self.code_table {
                if archive_table != table {
                    return Err(ArchiveError::CodeTableConflict { name: entry.name });
                }
            } else {
                self.set_code_table(table.clone())?;
            }
        }

        let record = FileTableRecord {
            name: entry.name,
            payload_crc32: crc32fast::hash(&entry.payload),
            original_size: entry.original_size,
            compressed_size,
            // Provisional; the layout pass assigns the real offset
            data_offset: if compressed_size == 0 { 0 } else { META_SIZE as u64 },
            flags: entry.flags,
            control_bits: entry.control_bits,
            padding_huffman: entry.padding_huffman,
            padding_hamming: entry.padding_hamming,
        };
        record.validate(&self.limits)?;

        debug!(
            name = %record.name,
            original_size = record.original_size,
            compressed_size,
            flags = %record.flags,
            "added archive entry"
        );
        self.entries.push((record, entry.payload));
        Ok(())
    }

    fn assemble(&self) -> ArchiveResult<Assembled> {
        let layout = ArchiveLayout::compute(
            self.entries
                .iter()
                .map(|(record, payload)| (record.name.len(), payload.len() as u64)),
        );

        let mut flags = self.flags;
        flags.set(CodecFlags::CRC32);
        let mut head = Vec::with_capacity(META_SIZE + layout.file_table_len as usize);
        head.resize(META_SIZE, 0);

        for ((record, _), placement) in self.entries.iter().zip(&layout.entries) {
            let mut record = record.clone();
            record.data_offset = placement.data_offset;
            flags.set(record.flags.value);

            let bytes = record.serialize_with_limits(self.byte_order, &self.limits)?;
            head.extend_from_slice(&bytes);
            head.resize(head.len() + (placement.record_len as usize - bytes.len()), 0);
        }

        let mut data_hasher = crc32fast::Hasher::new();
        for (_, payload) in &self.entries {
            data_hasher.update(payload);
        }

        let mut header = ArchiveHeader::new(self.byte_order);
        header.flags = flags;
        header.archive_size = layout.archive_size;
        header.data_crc32 = data_hasher.finalize();
        header.file_count = self.entries.len() as u32;
        header.data_section_offset = layout.data_section_offset;
        header.code_table = self.code_table.clone().unwrap_or_default();

        header.header_crc32 = 0;
        header.header_crc32 = header.compute_checksum()?;
        let meta = header.to_bytes_with_limits(&self.limits)?;
        head[..META_SIZE].copy_from_slice(&meta);

        Ok(Assembled { header, head })
    }

    fn write_to<W: Write>(&self, assembled: &Assembled, writer: &mut W) -> ArchiveResult<()> {
        writer.write_all(&assembled.head)?;
        for (_, payload) in &self.entries {
            writer.write_all(payload)?;
        }
        Ok(())
    }

    /// Serialize the whole archive into memory
    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        let assembled = self.assemble()?;
        let mut out = Vec::with_capacity(assembled.header.archive_size as usize);
        self.write_to(&assembled, &mut out)?;
        Ok(out)
    }

    /// Write the archive atomically and consume the writer
    ///
    /// On any error the destination path is left untouched.
    pub fn finalize(self) -> ArchiveResult<ArchiveSummary> {
        let assembled = self.assemble()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".otik-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        let mut writer = BufWriter::new(temp);
        self.write_to(&assembled, &mut writer)?;
        writer.flush()?;
        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        let header = assembled.header;
        info!(
            path = %self.path.display(),
            archive_size = header.archive_size,
            file_count = header.file_count,
            data_crc32 = format_args!("0x{:08x}", header.data_crc32),
            "archive written"
        );

        let entries = self
            .entries
            .into_iter()
            .map(|(record, _)| EntrySummary {
                name: record.name,
                original_size: record.original_size,
                stored_size: record.compressed_size,
                flags: record.flags,
            })
            .collect();

        Ok(ArchiveSummary {
            path: self.path,
            archive_size: header.archive_size,
            file_count: header.file_count,
            data_crc32: header.data_crc32,
            header_crc32: header.header_crc32,
            entries,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::huffman::{code_lengths, count_frequencies};
    use pretty_assertions::assert_eq;

    fn raw_entry(name: &str, payload: &[u8]) -> PendingEntry {
        PendingEntry {
            name: name.to_string(),
            payload: payload.to_vec(),
            original_size: payload.len() as u32,
            flags: CodecFlags::default(),
            control_bits: 0,
            padding_huffman: 0,
            padding_hamming: 0,
            code_table: None,
        }
    }

    #[test]
    fn test_empty_archive_bytes() {
        let writer = ArchiveWriter::new("unused.otik", ByteOrder::Little);
        let bytes = writer.to_bytes().expect("build");
        assert_eq!(bytes.len(), META_SIZE);

        let header = ArchiveHeader::parse(&bytes).expect("parse");
        assert_eq!(header.file_count, 0);
        assert_eq!(header.data_crc32, crc32fast::hash(&[]));
        assert!(header.validate_checksum().is_ok());
    }

    #[test]
    fn test_crc32_flag_always_set() {
        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Little);
        writer.add_entry(raw_entry("a", b"abc")).expect("add");
        let header = ArchiveHeader::parse(&writer.to_bytes().expect("build")).expect("parse");
        assert_eq!(header.flags.value, CodecFlags::CRC32);

        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Big);
        writer.set_flags(CodecFlags::SHA256);
        let header = ArchiveHeader::parse(&writer.to_bytes().expect("build")).expect("parse");
        assert_eq!(header.flags.value, CodecFlags::CRC32 | CodecFlags::SHA256);
    }

    #[test]
    fn test_index_flag_without_index_rejected() {
        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Little);
        writer.set_flags(CodecFlags::INDEX_TABLE);
        writer.add_entry(raw_entry("a", b"abc")).expect("add");
        let err = writer.to_bytes().expect_err("no index section is written");
        assert!(matches!(err, ArchiveError::MissingIndexSection));
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_layout_and_checksums() {
        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Big);
        writer.add_entry(raw_entry("a", b"hello")).expect("add");
        writer.add_entry(raw_entry("empty", b"")).expect("add");
        writer.add_entry(raw_entry("b", b"world!")).expect("add");

        let bytes = writer.to_bytes().expect("build");
        let header = ArchiveHeader::parse(&bytes).expect("parse");
        assert!(header.validate_checksum().is_ok());
        assert_eq!(header.file_count, 3);
        assert_eq!(header.archive_size, bytes.len() as u64);

        // records: 31→32, 35→40, 31→32
        assert_eq!(header.data_section_offset, 352 + 104);
        let data = &bytes[header.data_section_offset as usize..];
        assert_eq!(data, b"helloworld!");
        assert_eq!(header.data_crc32, crc32fast::hash(b"helloworld!"));
    }

    #[test]
    fn test_capacity_exceeded() {
        let limits = FormatLimits {
            max_files: 1,
            ..FormatLimits::default()
        };
        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Little).with_limits(limits);
        writer.add_entry(raw_entry("one", b"1")).expect("first");
        let err = writer.add_entry(raw_entry("two", b"2")).expect_err("second");
        assert!(matches!(err, ArchiveError::CapacityExceeded { max: 1 }));
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn test_invalid_entry_rejected_before_write() {
        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Little);
        let mut entry = raw_entry("bad", b"xyz");
        entry.padding_huffman = 9;
        assert!(writer.add_entry(entry).is_err());
        assert!(writer.is_empty());
    }

    #[test]
    fn test_code_table_conflict() {
        let mut writer = ArchiveWriter::new("unused.otik", ByteOrder::Little);

        let mut first = raw_entry("first", b"payload");
        first.flags = CodecFlags::new(CodecFlags::HUFFMAN);
        first.code_table = Some(code_lengths(&count_frequencies(b"aab")));
        writer.add_entry(first).expect("first");

        let mut second = raw_entry("second", b"payload");
        second.flags = CodecFlags::new(CodecFlags::HUFFMAN);
        second.code_table = Some(code_lengths(&count_frequencies(b"xyz")));
        let err = writer.add_entry(second).expect_err("conflict");
        assert!(matches!(err, ArchiveError::CodeTableConflict { ref name } if name == "second"));
        assert_eq!(err.kind(), crate::archive::ErrorKind::Capacity);
    }

    #[test]
    fn test_finalize_writes_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.otik");

        let mut writer = ArchiveWriter::new(&path, ByteOrder::Little);
        writer.add_entry(raw_entry("a.txt", b"abc")).expect("add");
        let expected = writer.to_bytes().expect("build");
        let summary = writer.finalize().expect("finalize");

        let written = std::fs::read(&path).expect("read back");
        assert_eq!(written, expected);
        assert_eq!(summary.archive_size, written.len() as u64);
        assert_eq!(summary.file_count, 1);
        assert_eq!(summary.entries[0].name, "a.txt");
        assert_eq!(summary.entries[0].stored_size, 3);
        assert!((summary.entries[0].ratio() - 1.0).abs() < f64::EPSILON);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .expect("list")
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != "out.otik")
            .collect();
        assert!(leftovers.is_empty());

        let header = ArchiveHeader::parse(&written).expect("parse");
        assert!(header.flags.has(CodecFlags::CRC32));
    }
}
