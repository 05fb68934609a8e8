//! Probe result cache keyed by (path, mtime, size).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use trackmux_core::MediaFile;

/// File identity used to decide whether a cached probe is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub mtime: Option<SystemTime>,
    pub size: u64,
}

impl CacheKey {
    /// Read the key from the filesystem.
    pub fn for_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            mtime: meta.modified().ok(),
            size: meta.len(),
        })
    }
}

/// Thread-safe map from path to the last probe of that path.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: Mutex<HashMap<PathBuf, (CacheKey, MediaFile)>>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `path`, only if it was stored under the same key.
    /// A stale entry is evicted.
    pub fn get(&self, path: &Path, key: CacheKey) -> Option<MediaFile> {
        let mut entries = self.entries.lock();
        match entries.get(path) {
            Some((stored, media)) if *stored == key => Some(media.clone()),
            Some(_) => {
                entries.remove(path);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, path: &Path, key: CacheKey, media: MediaFile) {
        self.entries.lock().insert(path.to_path_buf(), (key, media));
    }

    pub fn invalidate(&self, path: &Path) {
        self.entries.lock().remove(path);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
