//! Buffered sequential file input plus positional reads, compatible with
//! `O_DIRECT`.
//!
//! Sequential reads are served from an internal sector-aligned buffer that
//! is refilled one syscall at a time. Positional reads (`pread`) correct
//! their own alignment in direct mode: an unaligned request is satisfied by
//! looping aligned sector reads through the internal buffer and copying the
//! requested slice out. `seek` repositions the logical cursor; in direct
//! mode it seeks to the preceding sector boundary and pre-fills the buffer
//! so the cursor can point mid-sector.
//!
//! The reader either owns its descriptor (`open`) or shares one owned by
//! someone else (`attach`); detaching a shared descriptor never closes the
//! underlying file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use crate::errdata;
use crate::error::{Error, Result};
use crate::io::{align_up, AlignedBuf, SECTOR_SIZE};

pub struct AlignedReader {
    file: Option<Arc<File>>,
    buffer: AlignedBuf,
    /// Cursor into the valid region of `buffer`.
    position: usize,
    /// Number of valid bytes in `buffer`.
    valid: usize,
    direct: bool,
}

impl AlignedReader {
    /// Creates a reader with an internal buffer of at least `buffer_size`
    /// bytes, rounded up to a whole number of sectors.
    pub fn new(buffer_size: usize) -> Result<Self> {
        Ok(Self {
            file: None,
            buffer: AlignedBuf::new(align_up(buffer_size))?,
            position: 0,
            valid: 0,
            direct: false,
        })
    }

    /// Opens `path` read-only. With `direct` set the file is opened
    /// `O_DIRECT`.
    pub fn open(&mut self, path: &Path, direct: bool) -> Result<()> {
        if self.file.is_some() {
            return Err(Error::AlreadyOpen);
        }

        let mut opts = File::options();
        opts.read(true);

        #[cfg(target_os = "linux")]
        if direct {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_DIRECT);
        }

        self.file = Some(Arc::new(opts.open(path)?));
        self.direct = direct;
        self.invalidate();
        Ok(())
    }

    /// Adopts a descriptor owned elsewhere. Detaching (or dropping the
    /// reader) releases only this reader's handle on it.
    pub fn attach(&mut self, file: Arc<File>, direct: bool) {
        self.file = Some(file);
        self.direct = direct;
        self.invalidate();
    }

    /// Releases the current descriptor. For an attached descriptor the
    /// underlying file stays open with its owner.
    pub fn detach(&mut self) {
        self.file = None;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.position = 0;
        self.valid = 0;
    }

    /// Refills the buffer from the descriptor's current offset. Returns the
    /// number of bytes now valid, 0 at EOF.
    fn fill_buffer(&mut self) -> Result<usize> {
        let file = self.file.as_ref().ok_or(Error::NotOpen)?;
        match (&**file).read(&mut self.buffer[..]) {
            Ok(n) => {
                self.valid = n;
                self.position = 0;
                Ok(n)
            }
            Err(e) => {
                self.invalidate();
                Err(e.into())
            }
        }
    }

    /// Reads up to `out.len()` bytes from the stream. Returns the number of
    /// bytes produced, which is short only at end-of-file; 0 means EOF with
    /// nothing left.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if self.file.is_none() {
            return Err(Error::NotOpen);
        }

        let mut total = 0;
        while total < out.len() {
            if self.position == self.valid {
                match self.fill_buffer() {
                    Ok(0) => return Ok(total),
                    Ok(_) => {}
                    Err(e) => {
                        if total > 0 {
                            return Ok(total);
                        }
                        return Err(e);
                    }
                }
            }

            let n = (out.len() - total).min(self.valid - self.position);
            out[total..total + n]
                .copy_from_slice(&self.buffer[self.position..self.position + n]);
            self.position += n;
            total += n;
        }
        Ok(total)
    }

    /// Reads a fixed-width little-endian scalar.
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        if self.read(&mut raw)? != raw.len() {
            return errdata!("unexpected end of file reading scalar");
        }
        Ok(LittleEndian::read_u64(&raw))
    }

    /// Reads a length-prefixed byte string written by
    /// [`AlignedWriter::write_str`](super::AlignedWriter::write_str).
    pub fn read_str(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u64()? as usize;
        let mut s = vec![0u8; len];
        if self.read(&mut s)? != len {
            return errdata!("unexpected end of file reading {len} byte string");
        }
        Ok(s)
    }

    /// Random-access read of `out.len()` bytes at `offset`, independent of
    /// the sequential cursor. In direct mode an unaligned request is served
    /// through the internal buffer with aligned syscalls; any use of the
    /// internal buffer invalidates the sequential stream state. Returns the
    /// bytes produced, short only when the range crosses end-of-file.
    pub fn pread(&mut self, out: &mut [u8], offset: u64) -> Result<usize> {
        let file = self.file.as_ref().ok_or(Error::NotOpen)?.clone();

        if !self.direct {
            return read_at_full(&file, out, offset);
        }

        let out_aligned = (out.as_ptr() as usize) % SECTOR_SIZE == 0;
        let range_aligned =
            offset % SECTOR_SIZE as u64 == 0 && out.len() % SECTOR_SIZE == 0;
        if out_aligned && range_aligned && !out.is_empty() {
            return read_at_full(&file, out, offset);
        }

        // Alignment-correcting path: aligned sector reads into the private
        // buffer, copying the requested slice out.
        let mut copied = 0;
        let mut file_offset = offset;
        while copied < out.len() {
            let aligned_offset =
                file_offset / SECTOR_SIZE as u64 * SECTOR_SIZE as u64;
            let n = file.read_at(&mut self.buffer[..], aligned_offset)?;

            let skip = (file_offset - aligned_offset) as usize;
            if n <= skip {
                break; // EOF inside the skipped prefix
            }

            let available = n - skip;
            let want = out.len() - copied;
            let take = want.min(available);
            out[copied..copied + take].copy_from_slice(&self.buffer[skip..skip + take]);
            copied += take;
            file_offset += take as u64;

            if n < self.buffer.len() && copied < out.len() {
                break; // short sector read: end of file
            }
        }

        self.invalidate();
        Ok(copied)
    }

    /// Repositions the stream for subsequent `read` calls and returns the
    /// resulting absolute offset. The internal buffer is invalidated; in
    /// direct mode the descriptor is moved to the preceding sector boundary
    /// and the buffer pre-filled so the cursor lands mid-sector.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let file = self.file.as_ref().ok_or(Error::NotOpen)?.clone();

        let absolute = (&*file).seek(pos)?;
        self.invalidate();
        if !self.direct {
            return Ok(absolute);
        }

        let aligned = absolute / SECTOR_SIZE as u64 * SECTOR_SIZE as u64;
        let ahead = (absolute - aligned) as usize;
        (&*file).seek(SeekFrom::Start(aligned))?;

        let filled = self.fill_buffer()?;
        if filled == 0 {
            return Ok(absolute); // seek landed at or past EOF
        }
        if ahead >= self.valid {
            self.invalidate();
        } else {
            self.position = ahead;
        }
        Ok(absolute)
    }
}

/// Loops `read_at` until `out` is filled or EOF; returns bytes produced.
fn read_at_full(file: &File, out: &mut [u8], offset: u64) -> Result<usize> {
    let mut total = 0;
    while total < out.len() {
        match file.read_at(&mut out[total..], offset + total as u64) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}
