//! Writes one immutable data file: hash-sorted records, sector padding,
//! then the paged hash index.

use std::path::Path;

use crate::bucket::index::{IndexEntry, PageBuf, ENTRIES_PER_PAGE, HASHES_PER_SIDE};
use crate::bucket::kv::Kvs;
use crate::error::Result;
use crate::io::{AlignedWriter, SECTOR_SIZE};

/// Lays the batch out on disk and returns the number of records written.
/// The caller owns the path; on error the partially written file is left
/// for the caller to discard.
///
/// Records are sorted by key hash (stable, so equal hashes keep their input
/// order) and written back-to-back as length-prefixed key and value. The
/// data section is padded to the next sector boundary, then one index page
/// is emitted per `ENTRIES_PER_PAGE` records, each carrying skip bookmarks
/// for up to `HASHES_PER_SIDE` neighbor pages on either side.
///
/// Output goes through a one-sector buffer without direct I/O; the layout
/// keeps the file sector-aligned regardless.
pub fn write_file(path: &Path, mut kvs: Kvs) -> Result<u64> {
    kvs.sort_by_key(|kv| kv.hash);

    let mut out = AlignedWriter::new(SECTOR_SIZE)?;
    out.open(path, false)?;

    // Data section, remembering where each record starts.
    let mut offsets = Vec::with_capacity(kvs.len());
    let mut offset = 0u64;
    for kv in &kvs {
        offsets.push(offset);
        out.write_str(&kv.key)?;
        out.write_str(&kv.value)?;
        offset += (16 + kv.key.len() + kv.value.len()) as u64;
    }

    // Pad so the index section starts on a sector boundary.
    let tail = (offset % SECTOR_SIZE as u64) as usize;
    if tail > 0 {
        let padding = [0u8; SECTOR_SIZE];
        out.write(&padding[..SECTOR_SIZE - tail])?;
    }

    let total = kvs.len();
    let pages = total.div_ceil(ENTRIES_PER_PAGE);
    let mut page = PageBuf::new()?;
    for p in 0..pages {
        page.clear();

        let base = p * ENTRIES_PER_PAGE;
        let len = (total - base).min(ENTRIES_PER_PAGE);
        for j in 0..len {
            page.put_entry(
                j,
                IndexEntry {
                    hash: kvs[base + j].hash,
                    offset: offsets[base + j],
                },
            );
        }

        // Bookmarks ahead: the last hash of each following page. The final
        // page's last entry may sit before a full page boundary.
        let ahead = (pages - p - 1).min(HASHES_PER_SIDE);
        for k in 0..ahead {
            let last = ((p + 2 + k) * ENTRIES_PER_PAGE - 1).min(total - 1);
            page.put_post_hash(k, kvs[last].hash);
        }

        // Bookmarks behind: the first hash of each preceding page.
        let behind = p.min(HASHES_PER_SIDE);
        for k in 0..behind {
            let first = (p - 1 - k) * ENTRIES_PER_PAGE;
            page.put_pre_hash(k, kvs[first].hash);
        }

        out.write(page.bytes())?;
    }

    out.close()?;
    Ok(total as u64)
}
