//! Per-file bookkeeping for the data files a bucket owns.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bucket::index;
use crate::error::Result;
use crate::io::SECTOR_SIZE;

/// Metadata for one immutable data file: its path, how many records it
/// holds, its total byte size, and the read-only descriptor opened when the
/// file joined the bucket. The descriptor lives as long as the metadata and
/// is shared with readers during lookups.
pub struct DataFileMetadata {
    path: PathBuf,
    entries_count: u64,
    byte_size: u64,
    file: Arc<File>,
}

impl DataFileMetadata {
    /// Opens the file read-only and records its dimensions. Failing to open
    /// is fatal to bucket assembly: a file the bucket cannot read has no
    /// business being registered.
    pub fn new(path: impl Into<PathBuf>, entries_count: u64, byte_size: u64) -> Result<Self> {
        let path = path.into();
        let file = Arc::new(File::open(&path)?);
        Ok(Self {
            path,
            entries_count,
            byte_size,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries_count(&self) -> u64 {
        self.entries_count
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// The shared read descriptor.
    pub fn file(&self) -> Arc<File> {
        self.file.clone()
    }

    /// Byte offset where the index section starts: the data section plus
    /// padding occupy everything below it, the index pages everything above.
    pub fn index_offset(&self) -> u64 {
        let pages = (self.entries_count as usize).div_ceil(index::ENTRIES_PER_PAGE) as u64;
        self.byte_size - pages * SECTOR_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::index::ENTRIES_PER_PAGE;
    use crate::tmpfs::NamedTempFile;
    use std::fs;

    #[test]
    fn test_index_offset() {
        let tmp = NamedTempFile::new().unwrap();
        fs::write(tmp.path(), b"stub").unwrap();

        // One partially filled page.
        let meta = DataFileMetadata::new(tmp.path(), 10, 3 * SECTOR_SIZE as u64).unwrap();
        assert_eq!(meta.index_offset(), 2 * SECTOR_SIZE as u64);

        // Exactly two pages.
        let meta = DataFileMetadata::new(
            tmp.path(),
            2 * ENTRIES_PER_PAGE as u64,
            8 * SECTOR_SIZE as u64,
        )
        .unwrap();
        assert_eq!(meta.index_offset(), 6 * SECTOR_SIZE as u64);
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(DataFileMetadata::new("/nonexistent/bucket/0.data", 0, 0).is_err());
    }
}
