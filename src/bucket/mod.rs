//! An append-only collection of hash-indexed data files.
//!
//! ## Data file layout
//!
//! Every `insert` produces one immutable file:
//!
//! ```text
//! +--------------------+
//! | record 0           |  len-prefixed key, len-prefixed value,
//! +--------------------+  in ascending key-hash order
//! | ...                |
//! +--------------------+
//! | record N-1         |
//! +--------------------+
//! | zero padding       |  up to the next sector boundary
//! +--------------------+
//! | index page 0       |  one sector per 248 records, see `index`
//! +--------------------+
//! | ...                |
//! +--------------------+
//! ```
//!
//! A lookup hashes the key, probes every file's index for entries with that
//! hash, and keeps the candidates whose stored key matches exactly. Files
//! are probed in insertion order and matches accumulate across them, so a
//! key written in two batches yields both values, oldest first.
//!
//! The bucket is a single-threaded resource: `insert` and `read` must not
//! run concurrently on one bucket.

use std::fs;
use std::io::SeekFrom;

use crate::config::BucketConfig;
use crate::error::Result;

pub mod index;
pub mod kv;
pub mod metadata;
pub mod reader;
pub mod writer;

pub use kv::{Kv, Kvs};
pub use metadata::DataFileMetadata;
pub use reader::ReadContext;

use reader::collect_hash_offsets;

pub struct Bucket {
    config: BucketConfig,
    files: Vec<DataFileMetadata>,
}

impl Bucket {
    /// Opens a bucket in `dir` with default configuration, creating the
    /// directory if needed.
    pub fn open(dir: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::open_with_config(BucketConfig::new(dir))
    }

    /// Opens a bucket with custom configuration.
    pub fn open_with_config(config: BucketConfig) -> Result<Self> {
        fs::create_dir_all(&config.dir)?;
        Ok(Self {
            config,
            files: Vec::new(),
        })
    }

    /// Number of data files the bucket holds.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Writes `batch` as a new data file and registers it. On failure the
    /// partial file is removed and nothing is registered; the batch is
    /// reported failed as a whole.
    pub fn insert(&mut self, batch: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        let kvs: Kvs = batch
            .into_iter()
            .map(|(key, value)| {
                let hash = (self.config.hash_fn)(&key);
                Kv::with_hash(key, value, hash)
            })
            .collect();

        let path = self.config.dir.join(format!("{}.data", self.files.len()));
        match writer::write_file(&path, kvs) {
            Ok(entries) => {
                let byte_size = fs::metadata(&path)?.len();
                let meta = DataFileMetadata::new(&path, entries, byte_size)?;
                tracing::debug!(
                    entries = entries,
                    bytes = byte_size,
                    path = %path.display(),
                    "wrote bucket file"
                );
                self.files.push(meta);
                Ok(())
            }
            Err(e) => {
                if let Err(rm) = fs::remove_file(&path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %rm,
                        "failed to remove partial bucket file"
                    );
                }
                Err(e)
            }
        }
    }

    /// Returns every record whose key equals `key`, across all files in
    /// insertion order. An I/O failure inside one file's lookup is logged
    /// and contributes no matches; remaining files are still probed.
    pub fn read(&self, key: &[u8], ctx: &mut ReadContext) -> Kvs {
        let hash = (self.config.hash_fn)(key);
        let mut result = Kvs::new();
        for meta in &self.files {
            if let Err(e) = read_file(meta, key, hash, ctx, &mut result) {
                tracing::error!(
                    path = %meta.path().display(),
                    error = %e,
                    "lookup failed, skipping file"
                );
            }
            ctx.input.detach();
        }
        result
    }
}

/// Runs one key lookup against one data file, appending at most one match.
fn read_file(
    meta: &DataFileMetadata,
    key: &[u8],
    hash: u64,
    ctx: &mut ReadContext,
    result: &mut Kvs,
) -> Result<()> {
    if meta.entries_count() == 0 {
        return Ok(());
    }

    ctx.input.attach(meta.file(), false);
    let ReadContext {
        input,
        page,
        offsets,
    } = ctx;
    collect_hash_offsets(
        input,
        page,
        meta.entries_count() as usize,
        hash,
        meta.index_offset(),
        offsets,
    )?;

    // Verify candidates against the stored key; batches hold unique keys,
    // so the first match settles this file.
    for &offset in offsets.iter() {
        input.seek(SeekFrom::Start(offset))?;
        let stored = input.read_str()?;
        if stored == key {
            let value = input.read_str()?;
            result.push(Kv::with_hash(stored, value, hash));
            break;
        }
    }
    Ok(())
}
