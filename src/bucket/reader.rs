//! Equal-hash enumeration over the paged index of one data file.
//!
//! A lookup starts from an interpolated guess: the upper 32 bits of the
//! target hash, scaled by the entry count, land the cursor near where a
//! uniformly distributed hash would sit. The guess is only a seed: from
//! there the walk is driven entirely by comparisons, so any hash
//! distribution resolves correctly:
//!
//! - guess hash equal to the target: widen in both directions until the
//!   hashes change, collecting the whole equal run;
//! - guess below the target: hop forward using the post-hash bookmarks as a
//!   skip list, then scan up to the run;
//! - guess above the target: hop backward using the pre-hash bookmarks,
//!   then binary-search the landing page for the end of the run and walk
//!   it leftward.

use std::cmp::Ordering;

use crate::bucket::index::{PageBuf, PageIterator, HASHES_PER_SIDE};
use crate::error::Result;
use crate::io::{AlignedReader, SECTOR_SIZE};

/// Scratch state reused across lookups: the file reader, one page image,
/// and the candidate-offset list. One context serves one lookup at a time.
pub struct ReadContext {
    pub(crate) input: AlignedReader,
    pub(crate) page: PageBuf,
    pub(crate) offsets: Vec<u64>,
}

impl ReadContext {
    pub fn new() -> Result<Self> {
        Ok(Self {
            input: AlignedReader::new(SECTOR_SIZE)?,
            page: PageBuf::new()?,
            offsets: Vec::new(),
        })
    }
}

/// Collects the data-record offsets of every index entry matching `hash`
/// into `out`. `entries_total` and `index_offset` describe the file the
/// reader is attached to.
pub(crate) fn collect_hash_offsets(
    input: &mut AlignedReader,
    page: &mut PageBuf,
    entries_total: usize,
    hash: u64,
    index_offset: u64,
    out: &mut Vec<u64>,
) -> Result<()> {
    out.clear();
    if entries_total == 0 {
        return Ok(());
    }

    // Interpolation seed: correct hashes land on or near their page.
    let guess = ((hash >> 32) as u128 * entries_total as u128 >> 32) as usize;

    let mut iter = PageIterator::new(input, page, index_offset, entries_total);
    iter.init(guess)?;

    match iter.current().hash.cmp(&hash) {
        Ordering::Equal => {
            out.push(iter.current().offset);
            while iter.dec()? && iter.current().hash == hash {
                out.push(iter.current().offset);
            }
            iter.init(guess)?;
            while iter.inc()? && iter.current().hash == hash {
                out.push(iter.current().offset);
            }
        }
        Ordering::Less => {
            // Hop toward the first page whose last entry reaches the target.
            while iter.page_id() + 1 < iter.pages_total() && iter.last_hash() < hash {
                let ahead = (iter.pages_total() - iter.page_id() - 1).min(HASHES_PER_SIDE);
                let mut k = 0;
                while k < ahead && iter.post_hash(k) < hash {
                    k += 1;
                }
                // A qualifying bookmark is the first page that can hold the
                // target; otherwise hop past everything bookmarked.
                let jump = if k < ahead { k + 1 } else { ahead };
                iter.set_page(iter.page_id() + jump)?;
                iter.set_cursor(0);
            }
            loop {
                let entry = iter.current();
                if entry.hash == hash {
                    out.push(entry.offset);
                }
                if entry.hash > hash || !iter.inc()? {
                    break;
                }
            }
        }
        Ordering::Greater => {
            // Hop back toward the first page that starts at or below the
            // target.
            while iter.page_id() > 0 && iter.first_hash() > hash {
                let behind = iter.page_id().min(HASHES_PER_SIDE);
                let mut k = 0;
                while k < behind && iter.pre_hash(k) > hash {
                    k += 1;
                }
                if k == behind && behind == iter.page_id() {
                    // Even the first page starts above the target.
                    return Ok(());
                }
                let jump = if k < behind { k + 1 } else { behind };
                iter.set_page(iter.page_id() - jump)?;
            }

            // Largest entry at or below the target within this page.
            let mut bot = 0;
            let mut top = iter.page_len();
            while top > 1 {
                let mid = top / 2;
                if hash >= iter.entry(bot + mid).hash {
                    bot += mid;
                }
                top -= mid;
            }
            if iter.entry(bot).hash != hash {
                return Ok(());
            }

            // The run cannot continue past this page on the right: the next
            // page, if any, starts above the target. Find the run's end,
            // then walk it leftward across page boundaries.
            while bot + 1 < iter.page_len() && iter.entry(bot + 1).hash == hash {
                bot += 1;
            }
            iter.set_cursor(bot);
            out.push(iter.current().offset);
            while iter.dec()? && iter.current().hash == hash {
                out.push(iter.current().offset);
            }
        }
    }
    Ok(())
}
