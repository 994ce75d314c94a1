//! Scratch locations for tests: directories for whole buckets and paths
//! for single data files, cleaned up on drop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-process sequence number, combined with the pid so concurrent test
/// binaries sharing the scratch root cannot collide.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn scratch_path(prefix: &str) -> std::io::Result<PathBuf> {
    let root = std::env::temp_dir().join("bucketdb_tests");
    fs::create_dir_all(&root)?;
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    Ok(root.join(format!("{prefix}_{}_{id}", std::process::id())))
}

/// A directory for a test bucket to keep its data files in.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new() -> std::io::Result<Self> {
        let path = scratch_path("bucket")?;
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// A reserved path for one scratch data file. The file itself is created
/// by whatever writer the test points at the path.
pub struct NamedTempFile {
    path: PathBuf,
}

impl NamedTempFile {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            path: scratch_path("scratch")?.with_extension("data"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NamedTempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
