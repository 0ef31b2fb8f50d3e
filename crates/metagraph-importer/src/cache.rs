//! Content-addressed patch cache

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use metagraph_core::{ContentHash, Patch};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CacheError;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".cache/import";

/// Patches keyed by the SHA-256 of the source bytes they were imported from.
///
/// Entries never expire: any change to the input changes the key.
pub trait PatchCache: Send + Sync {
    fn get(&self, key: &ContentHash) -> Result<Option<Patch>, CacheError>;

    fn put(&self, key: &ContentHash, patch: &Patch) -> Result<(), CacheError>;

    fn clear(&self) -> Result<(), CacheError>;
}

/// One `<hex>.json` file per entry.
#[derive(Debug, Clone)]
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &ContentHash) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PatchCache for FsCache {
    fn get(&self, key: &ContentHash) -> Result<Option<Patch>, CacheError> {
        let path = self.entry_path(key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| CacheError::Corrupt { path, source })
    }

    fn put(&self, key: &ContentHash, patch: &Patch) -> Result<(), CacheError> {
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| CacheError::Io { path, source }
        };
        std::fs::create_dir_all(&self.dir).map_err(io(&self.dir))?;
        let path = self.entry_path(key);
        let text = serde_json::to_string(patch)?;

        // Entries appear whole or not at all.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io(&self.dir))?;
        tmp.write_all(text.as_bytes()).map_err(io(&path))?;
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e.error,
        })?;
        debug!("Cached {} ops at {}", patch.len(), path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}

/// Process-local cache, used in tests and for one-shot batch runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<ContentHash, Patch>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PatchCache for MemoryCache {
    fn get(&self, key: &ContentHash) -> Result<Option<Patch>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &ContentHash, patch: &Patch) -> Result<(), CacheError> {
        self.entries.insert(*key, patch.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}
