//! Single-slot durable cache for the environment listing.
//!
//! The slot holds the serialized response body and the time it was written.
//! Unreadable or unparseable contents are treated as a miss; writes go through
//! a temporary file in the same directory and an atomic rename.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info, warn};

/// File name of the cache slot inside the cache directory.
pub const CACHE_FILE_NAME: &str = "switchyard_env_cache.json";

/// Files left behind by earlier deployments: the unversioned raw cache.
pub const LEGACY_CACHE_FILES: [&str; 1] = ["env_cache.json"];

const TEMP_PREFIX: &str = ".switchyard-cache-";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Unix timestamp in milliseconds.
    pub written_at: i64,
    /// Response body, served verbatim while fresh.
    pub body: String,
}

impl CacheEntry {
    /// `now - written_at < ttl_ms`.
    #[must_use]
    pub const fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.written_at) < ttl_ms
    }
}

pub trait CacheStore: Send + Sync {
    /// The current entry, or `None` on a miss.
    fn read(&self) -> Option<CacheEntry>;

    /// Replace the entry.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be persisted.
    fn write(&self, entry: &CacheEntry) -> Result<()>;
}

impl<T: CacheStore + ?Sized> CacheStore for std::sync::Arc<T> {
    fn read(&self) -> Option<CacheEntry> {
        (**self).read()
    }

    fn write(&self, entry: &CacheEntry) -> Result<()> {
        (**self).write(entry)
    }
}

/// Cache slot stored as a JSON file.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self) -> Option<CacheEntry> {
        let path = self.path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No cache file at {}", path.display());
                return None;
            }
            Err(err) => {
                warn!("Failed to read cache file {}: {err}", path.display());
                return None;
            }
        };

        if contents.trim().is_empty() {
            warn!("Cache file {} is empty", path.display());
            return None;
        }

        match serde_json::from_str(&contents) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Ignoring corrupted cache file {}: {err}", path.display());
                None
            }
        }
    }

    fn write(&self, entry: &CacheEntry) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .context("Failed to create temporary cache file")?;
        serde_json::to_writer(&mut tmp, entry).context("Failed to serialize cache entry")?;
        tmp.flush().context("Failed to flush cache file")?;

        let path = self.path();
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist cache file {}", path.display()))?;
        debug!("Cache written to {}", path.display());
        Ok(())
    }
}

/// Cache slot held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    slot: Mutex<Option<CacheEntry>>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self) -> Option<CacheEntry> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn write(&self, entry: &CacheEntry) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("cache slot lock poisoned"))?;
        *slot = Some(entry.clone());
        Ok(())
    }
}

/// Removes legacy cache files and interrupted temporary writes from `dir`.
///
/// A file with a legacy name is only removed when it holds a listing with
/// `frontend` and `backend` keys; anything else is left to its owner.
///
/// Safe to run on every start; returns how many files were removed.
///
/// # Errors
/// Returns an error if `dir` exists but cannot be listed or a file cannot be removed.
pub fn migrate_legacy_files(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to list {}", dir.display()));
        }
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();
        let legacy = LEGACY_CACHE_FILES.contains(&&*name) && is_legacy_listing(&path);
        if !(legacy || name.starts_with(TEMP_PREFIX)) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed legacy cache file {}", path.display());
                removed += 1;
            }
            // Another process got there first.
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to remove {}", path.display()));
            }
        }
    }
    Ok(removed)
}

// Legacy files hold a bare listing: a JSON object with `frontend` and `backend`.
fn is_legacy_listing(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(serde_json::Value::Object(map)) => {
            map.contains_key("frontend") && map.contains_key("backend")
        }
        _ => false,
    }
}
