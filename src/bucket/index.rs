//! On-disk index pages and the cursor that walks them.
//!
//! The index section of a data file is a run of fixed-size pages, each
//! exactly one sector:
//!
//! ```text
//! +--------------------------+
//! | pre_hashes:  u64 x 8     |  first hash of each of the up to 8
//! +--------------------------+  preceding pages, nearest first
//! | post_hashes: u64 x 8     |  last hash of each of the up to 8
//! +--------------------------+  following pages, nearest first
//! | entries: (u64, u64) x E  |  (key hash, data-record offset), sorted
//! +--------------------------+  by hash; E fills the sector exactly
//! ```
//!
//! The bookmark arrays let a lookup skip up to eight pages per read while
//! hunting for the page whose hash range covers the target. Unused bookmark
//! and entry slots (first/last pages, partially filled final page) stay
//! zero and are never consulted.

use byteorder::{ByteOrder, LittleEndian};

use crate::errdata;
use crate::error::Result;
use crate::io::{AlignedBuf, AlignedReader, SECTOR_SIZE};

/// Bookmark count per side of a page.
pub const HASHES_PER_SIDE: usize = 8;

/// One index entry: key hash and the data-record offset it points at.
pub const ENTRY_SIZE: usize = 16;

/// Entries per page; the derived value fills the sector exactly.
pub const ENTRIES_PER_PAGE: usize =
    (SECTOR_SIZE - 2 * HASHES_PER_SIDE * 8) / ENTRY_SIZE;

const POST_HASHES_OFF: usize = HASHES_PER_SIDE * 8;
const ENTRIES_OFF: usize = 2 * HASHES_PER_SIDE * 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub hash: u64,
    pub offset: u64,
}

/// A single page image in sector-aligned memory, readable straight off a
/// direct-I/O descriptor. The writer builds pages in one of these too, so
/// the field offsets live in exactly one place.
pub struct PageBuf {
    buf: AlignedBuf,
}

impl PageBuf {
    pub fn new() -> Result<Self> {
        Ok(Self {
            buf: AlignedBuf::new(SECTOR_SIZE)?,
        })
    }

    pub fn pre_hash(&self, k: usize) -> u64 {
        LittleEndian::read_u64(&self.buf[k * 8..])
    }

    pub fn post_hash(&self, k: usize) -> u64 {
        LittleEndian::read_u64(&self.buf[POST_HASHES_OFF + k * 8..])
    }

    pub fn entry(&self, i: usize) -> IndexEntry {
        let at = ENTRIES_OFF + i * ENTRY_SIZE;
        IndexEntry {
            hash: LittleEndian::read_u64(&self.buf[at..]),
            offset: LittleEndian::read_u64(&self.buf[at + 8..]),
        }
    }

    pub fn put_pre_hash(&mut self, k: usize, hash: u64) {
        LittleEndian::write_u64(&mut self.buf[k * 8..k * 8 + 8], hash);
    }

    pub fn put_post_hash(&mut self, k: usize, hash: u64) {
        let at = POST_HASHES_OFF + k * 8;
        LittleEndian::write_u64(&mut self.buf[at..at + 8], hash);
    }

    pub fn put_entry(&mut self, i: usize, entry: IndexEntry) {
        let at = ENTRIES_OFF + i * ENTRY_SIZE;
        LittleEndian::write_u64(&mut self.buf[at..at + 8], entry.hash);
        LittleEndian::write_u64(&mut self.buf[at + 8..at + 16], entry.offset);
    }

    pub fn clear(&mut self) {
        self.buf.fill(0);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

/// Cursor over the index entries of one data file. The iterator holds one
/// loaded page at a time; advancing or retreating across a page boundary
/// costs a single sector-sized positional read.
pub struct PageIterator<'a> {
    input: &'a mut AlignedReader,
    page: &'a mut PageBuf,
    index_offset: u64,
    entries_total: usize,
    pages_total: usize,
    page_id: usize,
    /// Valid entries in the loaded page; only the last page can be short.
    page_len: usize,
    cursor: usize,
}

impl<'a> PageIterator<'a> {
    /// Creates an unpositioned iterator; call [`init`](Self::init) or
    /// [`set_page`](Self::set_page) before reading entries.
    pub fn new(
        input: &'a mut AlignedReader,
        page: &'a mut PageBuf,
        index_offset: u64,
        entries_total: usize,
    ) -> Self {
        Self {
            input,
            page,
            index_offset,
            entries_total,
            pages_total: entries_total.div_ceil(ENTRIES_PER_PAGE),
            page_id: 0,
            page_len: 0,
            cursor: 0,
        }
    }

    /// Positions the cursor on `entry_index` and loads its page.
    pub fn init(&mut self, entry_index: usize) -> Result<()> {
        self.cursor = entry_index % ENTRIES_PER_PAGE;
        self.set_page(entry_index / ENTRIES_PER_PAGE)
    }

    /// Loads page `page_id`, leaving the cursor where it was.
    pub fn set_page(&mut self, page_id: usize) -> Result<()> {
        self.page_id = page_id;
        self.page_len = if (page_id + 1) * ENTRIES_PER_PAGE > self.entries_total {
            self.entries_total - page_id * ENTRIES_PER_PAGE
        } else {
            ENTRIES_PER_PAGE
        };
        self.load()
    }

    fn load(&mut self) -> Result<()> {
        let at = self.index_offset + (self.page_id * SECTOR_SIZE) as u64;
        let n = self.input.pread(self.page.bytes_mut(), at)?;
        if n != SECTOR_SIZE {
            return errdata!("short index page read at {at}: {n} bytes");
        }
        Ok(())
    }

    /// The entry under the cursor.
    pub fn current(&self) -> IndexEntry {
        self.page.entry(self.cursor)
    }

    /// Advances one entry, crossing into the next page when needed.
    /// Returns false at the end of the index.
    pub fn inc(&mut self) -> Result<bool> {
        if self.cursor + 1 < self.page_len {
            self.cursor += 1;
            return Ok(true);
        }
        if self.page_id + 1 >= self.pages_total {
            return Ok(false);
        }
        self.cursor = 0;
        self.set_page(self.page_id + 1)?;
        Ok(true)
    }

    /// Retreats one entry, crossing into the previous page when needed.
    /// Returns false at the start of the index.
    pub fn dec(&mut self) -> Result<bool> {
        if self.cursor > 0 {
            self.cursor -= 1;
            return Ok(true);
        }
        if self.page_id == 0 {
            return Ok(false);
        }
        // Every page before the last is full.
        self.cursor = ENTRIES_PER_PAGE - 1;
        self.set_page(self.page_id - 1)?;
        Ok(true)
    }

    pub fn page_id(&self) -> usize {
        self.page_id
    }

    pub fn pages_total(&self) -> usize {
        self.pages_total
    }

    pub fn page_len(&self) -> usize {
        self.page_len
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, i: usize) {
        self.cursor = i;
    }

    pub fn entry(&self, i: usize) -> IndexEntry {
        self.page.entry(i)
    }

    /// Hash of the loaded page's first valid entry.
    pub fn first_hash(&self) -> u64 {
        self.page.entry(0).hash
    }

    /// Hash of the loaded page's last valid entry.
    pub fn last_hash(&self) -> u64 {
        self.page.entry(self.page_len - 1).hash
    }

    pub fn pre_hash(&self, k: usize) -> u64 {
        self.page.pre_hash(k)
    }

    pub fn post_hash(&self, k: usize) -> u64 {
        self.page.post_hash(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::AlignedWriter;
    use crate::tmpfs::NamedTempFile;

    #[test]
    fn test_page_layout_constants() {
        assert_eq!(ENTRIES_PER_PAGE, 248);
        assert_eq!(
            2 * HASHES_PER_SIDE * 8 + ENTRIES_PER_PAGE * ENTRY_SIZE,
            SECTOR_SIZE
        );
    }

    #[test]
    fn test_page_buf_roundtrip() {
        let mut page = PageBuf::new().unwrap();
        page.put_pre_hash(3, 0xAA);
        page.put_post_hash(0, 0xBB);
        page.put_entry(
            247,
            IndexEntry {
                hash: 0xCC,
                offset: 512,
            },
        );

        assert_eq!(page.pre_hash(3), 0xAA);
        assert_eq!(page.post_hash(0), 0xBB);
        assert_eq!(
            page.entry(247),
            IndexEntry {
                hash: 0xCC,
                offset: 512
            }
        );
        // Untouched slots read as zero.
        assert_eq!(page.pre_hash(0), 0);
        assert_eq!(page.entry(0).hash, 0);

        page.clear();
        assert_eq!(page.pre_hash(3), 0);
        assert_eq!(page.entry(247).offset, 0);
    }

    /// Writes an index-only file whose entry `i` is `(hash: i, offset: 2*i)`.
    fn write_index(total: usize) -> NamedTempFile {
        let tmp = NamedTempFile::new().unwrap();
        let mut out = AlignedWriter::new(SECTOR_SIZE).unwrap();
        out.open(tmp.path(), false).unwrap();

        let mut page = PageBuf::new().unwrap();
        let pages = total.div_ceil(ENTRIES_PER_PAGE);
        for p in 0..pages {
            page.clear();
            let len = (total - p * ENTRIES_PER_PAGE).min(ENTRIES_PER_PAGE);
            for j in 0..len {
                let i = (p * ENTRIES_PER_PAGE + j) as u64;
                page.put_entry(
                    j,
                    IndexEntry {
                        hash: i,
                        offset: 2 * i,
                    },
                );
            }
            out.write(page.bytes()).unwrap();
        }
        out.close().unwrap();
        tmp
    }

    #[test]
    fn test_iterator_walks_across_pages() {
        let total = 2 * ENTRIES_PER_PAGE + 5;
        let tmp = write_index(total);

        let mut input = AlignedReader::new(SECTOR_SIZE).unwrap();
        input.open(tmp.path(), false).unwrap();
        let mut page = PageBuf::new().unwrap();
        let mut iter = PageIterator::new(&mut input, &mut page, 0, total);

        // Forward from the last entry of page 0 into page 1.
        iter.init(ENTRIES_PER_PAGE - 1).unwrap();
        assert_eq!(iter.current().hash, ENTRIES_PER_PAGE as u64 - 1);
        assert!(iter.inc().unwrap());
        assert_eq!(iter.page_id(), 1);
        assert_eq!(iter.current().hash, ENTRIES_PER_PAGE as u64);

        // Backward across the same boundary.
        assert!(iter.dec().unwrap());
        assert_eq!(iter.page_id(), 0);
        assert_eq!(iter.current().hash, ENTRIES_PER_PAGE as u64 - 1);

        // The short final page stops `inc` at its last valid entry.
        iter.init(total - 1).unwrap();
        assert_eq!(iter.page_len(), 5);
        assert_eq!(iter.current().hash, total as u64 - 1);
        assert!(!iter.inc().unwrap());

        // And `dec` stops at entry zero of page zero.
        iter.init(0).unwrap();
        assert!(!iter.dec().unwrap());
    }

    #[test]
    fn test_iterator_full_scan() {
        let total = ENTRIES_PER_PAGE + 7;
        let tmp = write_index(total);

        let mut input = AlignedReader::new(SECTOR_SIZE).unwrap();
        input.open(tmp.path(), false).unwrap();
        let mut page = PageBuf::new().unwrap();
        let mut iter = PageIterator::new(&mut input, &mut page, 0, total);

        iter.init(0).unwrap();
        let mut seen = vec![iter.current().offset];
        while iter.inc().unwrap() {
            seen.push(iter.current().offset);
        }
        let want: Vec<u64> = (0..total as u64).map(|i| 2 * i).collect();
        assert_eq!(seen, want);
    }
}
