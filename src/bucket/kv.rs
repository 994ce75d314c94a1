//! Key/value records as they move through a bucket.

use crate::hasher::key_hash;

/// A key/value pair plus the 64-bit key hash the on-disk layout sorts by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kv {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub hash: u64,
}

impl Kv {
    /// Builds a record, hashing the key with the default hash function.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        let hash = key_hash(&key);
        Self {
            key,
            value: value.into(),
            hash,
        }
    }

    /// Builds a record with an explicit hash, for buckets configured with a
    /// non-default hash function.
    pub fn with_hash(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, hash: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            hash,
        }
    }
}

pub type Kvs = Vec<Kv>;
