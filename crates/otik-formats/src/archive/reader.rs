//! Streaming archive reader

use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::header::ArchiveHeader;
use crate::archive::limits::FormatLimits;
use crate::archive::record::{FileTableRecord, RecordPrefix};
use crate::archive::{META_SIZE, RECORD_PREFIX_SIZE};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Chunk size for streaming checksum passes (128 KiB)
pub const DATA_CHUNK_SIZE: usize = 2 << 16;

/// One decoded file-table record with its stored payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Record metadata
    pub record: FileTableRecord,
    /// Stored payload bytes, checksum verified
    pub payload: Vec<u8>,
}

/// Validated view of an archive
///
/// Opening reads and checks the meta region and the whole file table.
/// Payload bytes are only read on demand.
#[derive(Debug)]
pub struct ArchiveReader<R> {
    reader: R,
    header: ArchiveHeader,
    records: Vec<FileTableRecord>,
}

impl ArchiveReader<BufReader<File>> {
    /// Open an archive file
    pub fn open_path(path: impl AsRef<Path>) -> ArchiveResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Open with the default limits
    pub fn open(reader: R) -> ArchiveResult<Self> {
        Self::open_with_limits(reader, &FormatLimits::default())
    }

    /// Parse and validate the meta region and file table
    ///
    /// Any failure aborts the open; no partial table is returned.
    pub fn open_with_limits(mut reader: R, limits: &FormatLimits) -> ArchiveResult<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let mut meta = [0u8; META_SIZE];
        reader
            .read_exact(&mut meta)
            .map_err(ArchiveError::eof_as("meta region"))?;

        let header = ArchiveHeader::parse_with_limits(&meta, limits)?;
        header.validate_checksum()?;

        let mut records = Vec::with_capacity(header.file_count as usize);
        let mut position = META_SIZE as u64;
        for _ in 0..header.file_count {
            reader.seek(SeekFrom::Start(position))?;

            let mut prefix = [0u8; RECORD_PREFIX_SIZE];
            reader
                .read_exact(&mut prefix)
                .map_err(ArchiveError::eof_as("record prefix"))?;
            let prefix = RecordPrefix::parse(&prefix, header.byte_order)?;

            let mut name = vec![0u8; prefix.name_len as usize];
            reader
                .read_exact(&mut name)
                .map_err(ArchiveError::eof_as("record name"))?;

            let record = FileTableRecord::from_prefix(prefix, &name, limits)?;
            check_payload_range(&header, &record)?;

            position += record.padded_len() as u64;
            records.push(record);
        }

        if position > header.data_section_offset {
            return Err(ArchiveError::InvalidDataSectionOffset(
                header.data_section_offset,
            ));
        }

        debug!(
            file_count = header.file_count,
            byte_order = %header.byte_order,
            flags = %header.flags,
            "opened archive"
        );

        Ok(Self {
            reader,
            header,
            records,
        })
    }

    /// Validated header
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// File-table records in archive order
    pub fn records(&self) -> &[FileTableRecord] {
        &self.records
    }

    /// Give back the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read and checksum one entry's payload
    pub fn read_entry(&mut self, index: usize) -> ArchiveResult<ArchiveEntry> {
        let record = self
            .records
            .get(index)
            .cloned()
            .ok_or(ArchiveError::EntryOutOfRange {
                index,
                count: self.records.len(),
            })?;
        if record.compressed_size == 0 {
            return Ok(ArchiveEntry {
                record,
                payload: Vec::new(),
            });
        }

        self.reader.seek(SeekFrom::Start(record.data_offset))?;
        let mut payload = vec![0u8; record.compressed_size as usize];
        self.reader
            .read_exact(&mut payload)
            .map_err(ArchiveError::eof_as("entry payload"))?;

        let computed = crc32fast::hash(&payload);
        if computed != record.payload_crc32 {
            return Err(ArchiveError::PayloadChecksumMismatch {
                name: record.name,
                stored: record.payload_crc32,
                computed,
            });
        }

        debug!(name = %record.name, bytes = payload.len(), "read entry payload");
        Ok(ArchiveEntry { record, payload })
    }

    /// Iterate entries in order, stopping at the first failure
    ///
    /// Each call starts a fresh pass from the first entry.
    pub fn entries(&mut self) -> Entries<'_, R> {
        Entries {
            archive: self,
            next: 0,
            failed: false,
        }
    }

    /// Stream the data section and compare its CRC32 with the header
    ///
    /// The section spans `data_section_offset` up to the index section when
    /// one is declared, else to the end of the archive.
    pub fn verify_data_section(&mut self) -> ArchiveResult<bool> {
        let computed = self.data_section_crc()?;
        debug!(
            stored = format_args!("0x{:08x}", self.header.data_crc32),
            computed = format_args!("0x{computed:08x}"),
            "verified data section"
        );
        Ok(computed == self.header.data_crc32)
    }

    /// Like [`verify_data_section`](Self::verify_data_section) but fails on mismatch
    pub fn validate_data_section(&mut self) -> ArchiveResult<()> {
        let computed = self.data_section_crc()?;
        if computed != self.header.data_crc32 {
            return Err(ArchiveError::DataChecksumMismatch {
                stored: self.header.data_crc32,
                computed,
            });
        }
        Ok(())
    }

    fn data_section_crc(&mut self) -> ArchiveResult<u32> {
        let mut remaining = self.header.data_section_len();
        self.reader
            .seek(SeekFrom::Start(self.header.data_section_offset))?;

        let mut hasher = crc32fast::Hasher::new();
        let mut buffer = vec![0u8; DATA_CHUNK_SIZE.min(remaining as usize)];
        while remaining > 0 {
            let chunk = DATA_CHUNK_SIZE.min(remaining as usize);
            self.reader
                .read_exact(&mut buffer[..chunk])
                .map_err(ArchiveError::eof_as("data section"))?;
            hasher.update(&buffer[..chunk]);
            remaining -= chunk as u64;
        }
        Ok(hasher.finalize())
    }
}

/// Payload of a non-empty record must sit inside the data section
fn check_payload_range(header: &ArchiveHeader, record: &FileTableRecord) -> ArchiveResult<()> {
    if record.compressed_size == 0 {
        return Ok(());
    }
    let end = record
        .data_offset
        .checked_add(u64::from(record.compressed_size));
    match end {
        Some(end)
            if record.data_offset >= header.data_section_offset
                && end <= header.data_section_end() =>
        {
            Ok(())
        }
        _ => Err(ArchiveError::InvalidDataOffset {
            offset: record.data_offset,
            size: record.compressed_size,
        }),
    }
}

/// Fail-fast iterator returned by [`ArchiveReader::entries`]
#[derive(Debug)]
pub struct Entries<'a, R> {
    archive: &'a mut ArchiveReader<R>,
    next: usize,
    failed: bool,
}

impl<R: Read + Seek> Iterator for Entries<'_, R> {
    type Item = ArchiveResult<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.archive.records.len() {
            return None;
        }

        let result = self.archive.read_entry(self.next);
        self.next += 1;
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
