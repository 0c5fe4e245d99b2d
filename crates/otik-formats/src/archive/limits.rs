//! Configurable bounds applied during validation

use crate::archive::{META_SIZE, RECORD_ALIGNMENT, RECORD_PREFIX_SIZE};

/// Upper bounds checked by every header and record validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatLimits {
    /// Maximum number of entries per archive
    pub max_files: u32,
    /// Maximum entry name length in bytes
    pub max_name_len: usize,
    /// Maximum original or stored size of a single entry
    pub max_file_size: u64,
    /// Maximum `original_size / compressed_size`
    pub max_compression_ratio: u64,
}

impl FormatLimits {
    /// Default entry cap
    pub const DEFAULT_MAX_FILES: u32 = 10_000;
    /// Default name cap
    pub const DEFAULT_MAX_NAME_LEN: usize = 255;
    /// Default per-entry size cap (1 GiB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 30;
    /// Default ratio cap
    pub const DEFAULT_MAX_COMPRESSION_RATIO: u64 = 1000;

    /// Worst-case archive size for `file_count` entries
    pub fn max_archive_size(&self, file_count: u32) -> u64 {
        let count = u64::from(file_count);
        let record = align_up(RECORD_PREFIX_SIZE as u64 + self.max_name_len as u64);
        (META_SIZE as u64)
            .saturating_add(count.saturating_mul(record))
            .saturating_add(count.saturating_mul(self.max_file_size))
    }
}

impl Default for FormatLimits {
    fn default() -> Self {
        Self {
            max_files: Self::DEFAULT_MAX_FILES,
            max_name_len: Self::DEFAULT_MAX_NAME_LEN,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            max_compression_ratio: Self::DEFAULT_MAX_COMPRESSION_RATIO,
        }
    }
}

/// Round `offset` up to the record alignment
pub const fn align_up(offset: u64) -> u64 {
    let mask = RECORD_ALIGNMENT as u64 - 1;
    (offset + mask) & !mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), 8);
        assert_eq!(align_up(8), 8);
        assert_eq!(align_up(30), 32);
        assert_eq!(align_up(352), 352);
    }

    #[test]
    fn test_max_archive_size() {
        let limits = FormatLimits::default();
        assert_eq!(limits.max_archive_size(0), 352);
        // 30 + 255 = 285 → 288 per record
        assert_eq!(limits.max_archive_size(1), 352 + 288 + (1 << 30));
    }

    #[test]
    fn test_max_archive_size_saturates() {
        let limits = FormatLimits {
            max_file_size: u64::MAX,
            ..FormatLimits::default()
        };
        assert_eq!(limits.max_archive_size(2), u64::MAX);
    }
}
