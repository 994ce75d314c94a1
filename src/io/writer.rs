//! Buffered sequential file output over a sector-aligned staging buffer,
//! compatible with `O_DIRECT`.
//!
//! Data is copied into the internal aligned buffer and written out in
//! full-buffer increments, so every write syscall in direct mode transfers a
//! whole number of sectors from an aligned address at an aligned offset.
//! Only the stream's tail can be a partial chunk, and `close` handles it:
//! in direct mode the tail is zero-padded to the next sector boundary,
//! written, and the file is then truncated back to its logical length.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::{align_up, AlignedBuf};

pub struct AlignedWriter {
    file: Option<File>,
    buffer: AlignedBuf,
    /// Bytes staged in `buffer`, in `0..=buffer.len()`.
    position: usize,
    /// Logical stream length: everything accepted by `write`, flushed or
    /// still buffered. This is the size the file is truncated to when a
    /// direct-mode stream closes.
    total_bytes_written: u64,
    direct: bool,
}

impl AlignedWriter {
    /// Creates a writer with an internal buffer of at least `buffer_size`
    /// bytes, rounded up to a whole number of sectors.
    pub fn new(buffer_size: usize) -> Result<Self> {
        Ok(Self {
            file: None,
            buffer: AlignedBuf::new(align_up(buffer_size))?,
            position: 0,
            total_bytes_written: 0,
            direct: false,
        })
    }

    /// Opens `path` write-only, creating and truncating it. With `direct`
    /// set the file is opened `O_DIRECT` and every subsequent write syscall
    /// obeys the alignment rules.
    pub fn open(&mut self, path: &Path, direct: bool) -> Result<()> {
        if self.file.is_some() {
            return Err(Error::AlreadyOpen);
        }

        let mut opts = File::options();
        opts.write(true).create(true).truncate(true);

        #[cfg(target_os = "linux")]
        if direct {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_DIRECT);
        }

        self.file = Some(opts.open(path)?);
        self.direct = direct;
        self.position = 0;
        self.total_bytes_written = 0;
        Ok(())
    }

    /// Logical number of bytes accepted so far.
    pub fn total_bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    /// Writes the buffer to the file. Only ever called with a completely
    /// full buffer while streaming; the tail partial flush belongs to
    /// `close`.
    fn flush(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or(Error::NotOpen)?;
        if self.position == 0 {
            return Ok(());
        }
        file.write_all(&self.buffer[..self.position])?;
        self.position = 0;
        Ok(())
    }

    /// Copies `data` into the staging buffer, flushing each time the buffer
    /// fills exactly. Returns the number of bytes accepted. On a flush
    /// failure the bytes already consigned are counted before the error is
    /// returned, so `total_bytes_written` stays truthful.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if self.file.is_none() {
            return Err(Error::NotOpen);
        }

        let mut remaining = data;
        while !remaining.is_empty() {
            let space = self.buffer.len() - self.position;
            let n = remaining.len().min(space);
            self.buffer[self.position..self.position + n].copy_from_slice(&remaining[..n]);
            self.position += n;
            remaining = &remaining[n..];

            if self.position == self.buffer.len() {
                if let Err(e) = self.flush() {
                    self.total_bytes_written += (data.len() - remaining.len()) as u64;
                    return Err(e);
                }
            }
        }
        self.total_bytes_written += data.len() as u64;
        Ok(data.len())
    }

    /// Writes a fixed-width scalar in little-endian byte order.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut raw = [0u8; 8];
        LittleEndian::write_u64(&mut raw, value);
        self.write(&raw)?;
        Ok(())
    }

    /// Writes a length-prefixed byte string: an 8-byte little-endian length
    /// followed by the bytes themselves.
    pub fn write_str(&mut self, s: &[u8]) -> Result<()> {
        self.write_u64(s.len() as u64)?;
        self.write(s)?;
        Ok(())
    }

    /// Flushes any buffered tail and closes the file. In direct mode the
    /// tail is zero-padded to a sector boundary before the final write and
    /// the file is truncated to the logical length afterwards. The
    /// descriptor is released even when a step fails.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let mut result = Ok(());
        if self.direct {
            if self.position > 0 {
                let aligned = align_up(self.position);
                self.buffer[self.position..aligned].fill(0);
                result = file
                    .write_all(&self.buffer[..aligned])
                    .map_err(Error::from);
                self.position = 0;
            }
            if result.is_ok() {
                result = file.set_len(self.total_bytes_written).map_err(Error::from);
            }
        } else {
            let tail = self.position;
            if tail > 0 {
                result = file.write_all(&self.buffer[..tail]).map_err(Error::from);
                self.position = 0;
            }
        }

        drop(file);
        result
    }
}

impl Drop for AlignedWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
