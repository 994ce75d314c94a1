use std::path::PathBuf;

use crate::hasher::{key_hash, HashFn};

/// Configuration for a bucket.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    /// Directory the bucket's data files live in.
    pub dir: PathBuf,

    /// Key-hash function. Part of the file format: files written with one
    /// function are unreadable with another (default: CRC-64/ECMA).
    pub hash_fn: HashFn,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./bucketdb"),
            hash_fn: key_hash,
        }
    }
}

impl BucketConfig {
    /// Create a new config with the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Override the key-hash function
    pub fn hash_fn(mut self, f: HashFn) -> Self {
        self.hash_fn = f;
        self
    }
}
