use crc::{Crc, CRC_64_ECMA_182};

/// The fixed key digest. The hash is written into every index entry, so the
/// algorithm is part of the file format: a file hashed with one function is
/// unreadable with another.
pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Signature of a key-hash function. The default is [`key_hash`]; buckets can
/// be configured with a different one (tests use this to force collisions).
pub type HashFn = fn(&[u8]) -> u64;

/// Hashes a key to the 64-bit value used for sorting and index lookup.
pub fn key_hash(key: &[u8]) -> u64 {
    CRC64.checksum(key)
}
