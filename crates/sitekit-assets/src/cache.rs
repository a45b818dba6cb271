//! Content-hash cache for optimized images.
//!
//! Entries are keyed by a blake3 hash of the source bytes and stored on disk
//! so unchanged images survive across processes. Cache keys never involve
//! file names: renaming a source image hits the same entry.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::util::write_atomic;

/// A 256-bit blake3 content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Hex representation, used as the on-disk entry name.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars are plenty for log lines
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Errors that can occur in the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Disk-backed store of optimized image bytes.
#[derive(Debug, Clone)]
pub struct ImageCache {
    root: PathBuf,
}

impl ImageCache {
    /// Create a cache rooted at the given directory. Nothing is created on
    /// disk until the first `put`.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn entry_path(&self, hash: ContentHash) -> PathBuf {
        self.root.join(hash.to_hex())
    }

    /// Look up the optimized bytes for a source hash.
    pub fn get(&self, hash: ContentHash) -> Option<Vec<u8>> {
        fs::read(self.entry_path(hash)).ok()
    }

    /// Store optimized bytes under a source hash.
    pub fn put(&self, hash: ContentHash, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(hash);
        write_atomic(&path, bytes).map_err(|source| CacheError::Io { path, source })
    }

    /// Remove every entry. Synchronous: the store is gone when this returns.
    pub fn clear_all(&self) -> Result<(), CacheError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                path: self.root.clone(),
                source,
            }),
        }
    }
}
