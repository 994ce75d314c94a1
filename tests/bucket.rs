use bucketdb::tmpfs::TempDir;
use bucketdb::{Bucket, BucketConfig, ReadContext};

fn numeric_batch(range: std::ops::Range<i64>) -> Vec<(Vec<u8>, Vec<u8>)> {
    range
        .map(|i| (i.to_string().into_bytes(), (-i).to_string().into_bytes()))
        .collect()
}

#[test]
fn test_small_batch_roundtrip() {
    let dir = TempDir::new().unwrap();
    let mut bucket = Bucket::open(dir.path()).unwrap();
    bucket
        .insert(vec![
            (b"a".to_vec(), b"A".to_vec()),
            (b"b".to_vec(), b"B".to_vec()),
            (b"c".to_vec(), b"C".to_vec()),
        ])
        .unwrap();

    let mut ctx = ReadContext::new().unwrap();
    let got = bucket.read(b"b", &mut ctx);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].key, b"b");
    assert_eq!(got[0].value, b"B");
}

#[test]
fn test_large_batch_every_key_resolves() {
    // Spans ~80 index pages, so lookups exercise the interpolation seed and
    // both skip directions under the real hash distribution.
    const N: i64 = 20_000;

    let dir = TempDir::new().unwrap();
    let mut bucket = Bucket::open(dir.path()).unwrap();
    bucket.insert(numeric_batch(0..N)).unwrap();

    let mut ctx = ReadContext::new().unwrap();
    for i in 0..N {
        let got = bucket.read(i.to_string().as_bytes(), &mut ctx);
        assert_eq!(got.len(), 1, "key {i}");
        assert_eq!(got[0].value, (-i).to_string().into_bytes(), "key {i}");
    }
    for i in N..N + 5_000 {
        assert!(
            bucket.read(i.to_string().as_bytes(), &mut ctx).is_empty(),
            "key {i} should be absent"
        );
    }
}

#[test]
fn test_duplicate_key_across_batches() {
    let dir = TempDir::new().unwrap();
    let mut bucket = Bucket::open(dir.path()).unwrap();
    bucket.insert(vec![(b"x".to_vec(), b"1".to_vec())]).unwrap();
    bucket.insert(vec![(b"x".to_vec(), b"2".to_vec())]).unwrap();

    let mut ctx = ReadContext::new().unwrap();
    let got = bucket.read(b"x", &mut ctx);
    let values: Vec<&[u8]> = got.iter().map(|kv| kv.value.as_slice()).collect();
    assert_eq!(values, vec![&b"1"[..], b"2"]);
}

#[test]
fn test_lookups_across_several_files() {
    let dir = TempDir::new().unwrap();
    let mut bucket = Bucket::open(dir.path()).unwrap();
    bucket.insert(numeric_batch(0..1_000)).unwrap();
    bucket.insert(numeric_batch(1_000..2_000)).unwrap();
    bucket.insert(numeric_batch(2_000..3_000)).unwrap();
    assert_eq!(bucket.file_count(), 3);

    let mut ctx = ReadContext::new().unwrap();
    for i in [0, 999, 1_000, 1_999, 2_500, 2_999] {
        let got = bucket.read(i.to_string().as_bytes(), &mut ctx);
        assert_eq!(got.len(), 1, "key {i}");
        assert_eq!(got[0].value, (-i).to_string().into_bytes());
    }
    assert!(bucket.read(b"3000", &mut ctx).is_empty());
}

#[test]
fn test_clustered_hash_distributions() {
    // Hashes concentrated at the top of the 64-bit range push every
    // interpolated seed to the file's tail; lookups for early records must
    // recover through the pre-hash bookmarks.
    fn high_hash(key: &[u8]) -> u64 {
        (0xFFFF_FF00u64 << 32) | bucketdb::hasher::key_hash(key) as u32 as u64
    }

    let dir = TempDir::new().unwrap();
    let config = BucketConfig::new(dir.path()).hash_fn(high_hash);
    let mut bucket = Bucket::open_with_config(config).unwrap();
    bucket.insert(numeric_batch(0..5_000)).unwrap();

    let mut ctx = ReadContext::new().unwrap();
    for i in 0..5_000 {
        let got = bucket.read(i.to_string().as_bytes(), &mut ctx);
        assert_eq!(got.len(), 1, "key {i}");
        assert_eq!(got[0].value, (-i).to_string().into_bytes());
    }
}

#[test]
fn test_values_survive_batch_reordering() {
    // Insertion order inside a batch is irrelevant to lookups.
    let dir = TempDir::new().unwrap();
    let mut bucket = Bucket::open(dir.path()).unwrap();
    let mut batch = numeric_batch(0..500);
    batch.reverse();
    bucket.insert(batch).unwrap();

    let mut ctx = ReadContext::new().unwrap();
    for i in [0, 42, 499] {
        let got = bucket.read(i.to_string().as_bytes(), &mut ctx);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, (-i).to_string().into_bytes());
    }
}
