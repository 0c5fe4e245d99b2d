//! Offset computation for the file table and data section

use crate::archive::limits::align_up;
use crate::archive::{META_SIZE, RECORD_PREFIX_SIZE};
use tracing::debug;

/// Placement of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPlacement {
    /// Absolute offset of the record
    pub record_offset: u64,
    /// Record size including alignment pad
    pub record_len: u64,
    /// Absolute payload offset, 0 for empty payloads
    pub data_offset: u64,
    /// Payload length
    pub payload_len: u64,
}

/// Full archive layout, a pure function of the entry list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    /// One placement per entry, in entry order
    pub entries: Vec<EntryPlacement>,
    /// Total file-table size including alignment pads
    pub file_table_len: u64,
    /// Absolute offset of the data section
    pub data_section_offset: u64,
    /// Total payload bytes
    pub data_section_len: u64,
    /// Final archive size
    pub archive_size: u64,
}

impl ArchiveLayout {
    /// Lay out entries given `(name_len, payload_len)` pairs
    pub fn compute<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, u64)>,
    {
        let sizes: Vec<(u64, u64)> = entries
            .into_iter()
            .map(|(name_len, payload_len)| {
                (
                    align_up((RECORD_PREFIX_SIZE + name_len) as u64),
                    payload_len,
                )
            })
            .collect();

        let file_table_len: u64 = sizes.iter().map(|(record_len, _)| record_len).sum();
        let data_section_offset = META_SIZE as u64 + file_table_len;

        let mut record_cursor = META_SIZE as u64;
        let mut data_cursor = data_section_offset;
        let mut placements = Vec::with_capacity(sizes.len());
        for (record_len, payload_len) in sizes {
            let data_offset = if payload_len == 0 { 0 } else { data_cursor };
            placements.push(EntryPlacement {
                record_offset: record_cursor,
                record_len,
                data_offset,
                payload_len,
            });
            record_cursor += record_len;
            data_cursor += payload_len;
        }

        let data_section_len = data_cursor - data_section_offset;
        let archive_size = data_section_offset + data_section_len;

        debug!(
            entries = placements.len(),
            file_table_len, data_section_offset, data_section_len, archive_size, "computed archive layout"
        );

        Self {
            entries: placements,
            file_table_len,
            data_section_offset,
            data_section_len,
            archive_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_archive() {
        let layout = ArchiveLayout::compute(std::iter::empty());
        assert!(layout.entries.is_empty());
        assert_eq!(layout.file_table_len, 0);
        assert_eq!(layout.data_section_offset, 352);
        assert_eq!(layout.archive_size, 352);
    }

    #[test]
    fn test_single_entry() {
        // 30 + 9 = 39 → 40
        let layout = ArchiveLayout::compute([(9, 100)]);
        assert_eq!(layout.file_table_len, 40);
        assert_eq!(layout.data_section_offset, 392);
        assert_eq!(
            layout.entries[0],
            EntryPlacement {
                record_offset: 352,
                record_len: 40,
                data_offset: 392,
                payload_len: 100,
            }
        );
        assert_eq!(layout.archive_size, 492);
    }

    #[test]
    fn test_multiple_entries_with_empty_payload() {
        // records: 32, 40, 32 → table 104, data at 456
        let layout = ArchiveLayout::compute([(2, 10), (10, 0), (1, 7)]);
        assert_eq!(layout.file_table_len, 104);
        assert_eq!(layout.data_section_offset, 456);

        let offsets: Vec<u64> = layout.entries.iter().map(|e| e.record_offset).collect();
        assert_eq!(offsets, vec![352, 384, 424]);

        let data: Vec<u64> = layout.entries.iter().map(|e| e.data_offset).collect();
        assert_eq!(data, vec![456, 0, 466]);

        assert_eq!(layout.data_section_len, 17);
        assert_eq!(layout.archive_size, 473);
    }

    #[test]
    fn test_records_are_aligned() {
        let layout = ArchiveLayout::compute((0..20).map(|i| (i, 1)));
        for entry in &layout.entries {
            assert_eq!(entry.record_offset % 8, 0);
            assert_eq!(entry.record_len % 8, 0);
        }
        assert_eq!(layout.data_section_offset % 8, 0);
    }
}
