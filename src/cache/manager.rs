//! Two-tier cache manager
//!
//! Provides a `Cache` that keeps entries both in an in-process map and as one JSON
//! file per key on disk. Reads try memory first and fall back to disk; writes go to
//! both tiers. Failures on either tier never reach the caller: they degrade to a miss
//! or a no-op and are logged when logging is enabled.
//!
//! A `Cache` has a single owner and performs no locking. Two instances must not share
//! a `root_name/name` directory, since nothing coordinates their writes on disk.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use super::converter::Converters;
use super::dirs::{DirectorySupplier, PlatformDirectories};
use super::entry::{parse_timestamp, Entry};
use super::error::CacheError;
use crate::config::CacheConfig;

/// Counts of what a `cleanup` sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Expired entries dropped from the memory tier
    pub memory_evicted: usize,
    /// Expired or corrupt files deleted from the cache directory
    pub files_removed: usize,
}

/// Maps a key to its file name inside the cache directory
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `_` and `.json` is appended.
/// Keys that differ only in replaced characters (`"a/b"` and `"a:b"`) share a file
/// and overwrite each other.
pub fn file_name_for_key(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    name.push_str(".json");
    name
}

/// A key-value cache with an in-memory tier and an on-disk JSON tier
///
/// Files live at `{temporary_root}/{root_name}/{name}/{sanitized key}.json`, where the
/// temporary root comes from a [`DirectorySupplier`] (the platform cache directory by
/// default).
pub struct Cache<T> {
    config: CacheConfig,
    converters: Converters<T>,
    supplier: Arc<dyn DirectorySupplier>,
    /// Resolved lazily on first disk access
    cache_dir: Option<PathBuf>,
    memory: HashMap<String, Entry<T>>,
}

impl<T> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("cache_dir", &self.cache_dir)
            .field("memory_entries", &self.memory.len())
            .finish()
    }
}

impl<T> Cache<T> {
    /// Creates a cache rooted in the platform's temporary storage directory
    pub fn new(config: CacheConfig, converters: Converters<T>) -> Self {
        Self::with_supplier(config, converters, PlatformDirectories)
    }

    /// Creates a cache whose storage root comes from a custom supplier
    ///
    /// Pass a `PathBuf` to pin the root, e.g. to a temporary directory in tests.
    pub fn with_supplier(
        config: CacheConfig,
        converters: Converters<T>,
        supplier: impl DirectorySupplier + 'static,
    ) -> Self {
        Self {
            config,
            converters,
            supplier: Arc::new(supplier),
            cache_dir: None,
            memory: HashMap::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The directory this instance stores its files in, if a root is available
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            self.supplier
                .temporary_root()
                .map(|root| root.join(&self.config.root_name).join(&self.config.name))
        })
    }

    /// Number of entries held in memory, including expired ones not yet evicted
    pub fn memory_cache_count(&self) -> usize {
        self.memory.len()
    }

    /// Expiry instant of the in-memory entry for `key`
    ///
    /// Never touches disk: returns `None` unless the key is resident in memory.
    pub fn expiry_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.memory.get(key).map(Entry::expires_at)
    }

    /// Time left on the in-memory entry for `key`, zero if it has expired
    ///
    /// Never touches disk: returns `None` unless the key is resident in memory.
    pub fn remaining_time(&self, key: &str) -> Option<Duration> {
        self.memory.get(key).map(Entry::remaining_time)
    }

    fn resolve_dir(&mut self) -> Result<PathBuf, CacheError> {
        let dir = self.cache_dir().ok_or(CacheError::NoTemporaryRoot)?;
        self.cache_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Resolves the cache directory, creating it if it is missing
    async fn ensure_dir(&mut self) -> Result<PathBuf, CacheError> {
        let dir = self.resolve_dir()?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| CacheError::Write {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    async fn file_path(&mut self, key: &str) -> Result<PathBuf, CacheError> {
        let dir = self.ensure_dir().await?;
        Ok(dir.join(file_name_for_key(key)))
    }

    /// Reads and decodes the file at `path`; `Ok(None)` if it does not exist
    async fn read_entry(&self, path: &Path) -> Result<Option<Entry<T>>, CacheError> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let record: Value =
            serde_json::from_str(&contents).map_err(|source| CacheError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        Entry::deserialize(record, &self.converters).map(Some)
    }

    async fn write_record(&mut self, key: &str, record: &Value) -> Result<PathBuf, CacheError> {
        let path = self.file_path(key).await?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        fs::write(&path, json)
            .await
            .map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    async fn remove_file_for(&mut self, key: &str) -> Result<bool, CacheError> {
        let path = self.file_path(key).await?;
        delete_file(&path).await
    }

    /// Deletes every expired or unreadable file in the cache directory
    async fn sweep_files(&mut self) -> Result<usize, CacheError> {
        let dir = self.ensure_dir().await?;
        let read_error = |source| CacheError::Read {
            path: dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&dir).await.map_err(read_error)?;
        let mut removed = 0;

        loop {
            // Keep the partial count if iteration fails midway
            let item = match entries.next_entry().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(source) => {
                    self.trace_failure(&read_error(source));
                    break;
                }
            };

            match item.file_type().await {
                Ok(file_type) if file_type.is_file() => {}
                _ => continue,
            }

            let path = item.path();
            if !self.file_is_stale(&path).await {
                continue;
            }

            match delete_file(&path).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => self.trace_failure(&err),
            }
        }

        Ok(removed)
    }

    /// True when the file's entry has expired or the file cannot be parsed
    async fn file_is_stale(&self, path: &Path) -> bool {
        match read_expiry(path).await {
            Ok(expires_at) => Utc::now() >= expires_at,
            Err(err) => {
                self.trace_failure(&err);
                true
            }
        }
    }

    fn trace(&self, key: &str, event: &str) {
        if self.config.logging_enabled {
            debug!(cache = %self.config.name, key, "{event}");
        }
    }

    fn trace_failure(&self, err: &CacheError) {
        if self.config.logging_enabled {
            warn!(cache = %self.config.name, kind = err.kind(), "{err}");
        }
    }
}

impl<T: Clone> Cache<T> {
    /// Returns the cached value for `key`, or `None` on a miss
    ///
    /// Memory is checked first; an expired memory entry is evicted and disk is
    /// consulted. A valid disk entry is copied back into memory. An expired disk
    /// entry is deleted. Unreadable files count as a miss.
    pub async fn get(&mut self, key: &str) -> Option<T> {
        if self.config.use_memory_cache {
            if let Some(entry) = self.memory.get(key) {
                if !entry.is_expired() {
                    self.trace(key, "memory hit");
                    return Some(entry.data().clone());
                }
                self.memory.remove(key);
                self.trace(key, "evicted expired memory entry");
            }
        }

        let path = match self.file_path(key).await {
            Ok(path) => path,
            Err(err) => {
                self.trace_failure(&err);
                return None;
            }
        };

        let entry = match self.read_entry(&path).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.trace(key, "miss");
                return None;
            }
            Err(err) => {
                self.trace_failure(&err);
                return None;
            }
        };

        if entry.is_expired() {
            if let Err(err) = delete_file(&path).await {
                self.trace_failure(&err);
            }
            self.trace(key, "expired on disk");
            return None;
        }

        self.trace(key, "disk hit");
        if self.config.use_memory_cache {
            let data = entry.data().clone();
            self.memory.insert(key.to_string(), entry);
            Some(data)
        } else {
            Some(entry.into_data())
        }
    }

    /// Stores `data` under `key` with the configured default TTL
    pub async fn set(&mut self, key: &str, data: T) {
        let ttl = self.config.default_ttl;
        self.set_with_ttl(key, data, ttl).await;
    }

    /// Stores `data` under `key`, expiring after `ttl`
    ///
    /// Overwrites any previous entry in both tiers. If the disk write fails the
    /// memory tier still holds the new entry.
    pub async fn set_with_ttl(&mut self, key: &str, data: T, ttl: Duration) {
        let entry = Entry::with_ttl(data, ttl);
        let record = entry.serialize(&self.converters);

        if self.config.use_memory_cache {
            self.memory.insert(key.to_string(), entry);
        }

        let written = match record {
            Ok(record) => self.write_record(key, &record).await,
            Err(err) => Err(err),
        };

        match written {
            Ok(_) => self.trace(key, "stored"),
            Err(err) => self.trace_failure(&err),
        }
    }

    /// Whether `get(key)` would return a value
    ///
    /// This is a full `get`: it may read disk, repopulate memory and evict
    /// expired entries.
    pub async fn has(&mut self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Removes `key` from both tiers
    pub async fn remove(&mut self, key: &str) {
        self.memory.remove(key);

        match self.remove_file_for(key).await {
            Ok(_) => self.trace(key, "removed"),
            Err(err) => self.trace_failure(&err),
        }
    }

    /// Empties memory and deletes the cache directory
    ///
    /// Memory is always cleared, even when deleting the directory fails.
    pub async fn clear(&mut self) {
        self.memory.clear();

        let dir = match self.resolve_dir() {
            Ok(dir) => dir,
            Err(err) => {
                self.trace_failure(&err);
                return;
            }
        };

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                self.trace_failure(&CacheError::Delete { path: dir, source });
                return;
            }
        }

        if self.config.logging_enabled {
            info!(cache = %self.config.name, "cache cleared");
        }
    }

    /// Evicts expired entries from memory and deletes expired or corrupt files
    ///
    /// Runs only when called; the cache never schedules sweeps itself.
    pub async fn cleanup(&mut self) -> CleanupReport {
        let before = self.memory.len();
        self.memory.retain(|_, entry| !entry.is_expired());
        let memory_evicted = before - self.memory.len();

        let files_removed = match self.sweep_files().await {
            Ok(removed) => removed,
            Err(err) => {
                self.trace_failure(&err);
                0
            }
        };

        if self.config.logging_enabled {
            info!(
                cache = %self.config.name,
                memory_evicted,
                files_removed,
                "cleanup finished"
            );
        }

        CleanupReport {
            memory_evicted,
            files_removed,
        }
    }

    /// Returns the cached value for `key`, or fetches, stores and returns a fresh one
    ///
    /// A fetch error is returned as-is and nothing is stored. `ttl` falls back to
    /// the configured default.
    pub async fn get_or_fetch<F, Fut, E>(
        &mut self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.get(key).await {
            return Ok(data);
        }

        let data = fetch().await?;
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        self.set_with_ttl(key, data.clone(), ttl).await;
        Ok(data)
    }
}

/// Removes a file; `Ok(false)` if it was already gone
async fn delete_file(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CacheError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads only the `expiresAt` field of a cache file, without decoding the payload
async fn read_expiry(path: &Path) -> Result<DateTime<Utc>, CacheError> {
    let contents = fs::read_to_string(path)
        .await
        .map_err(|source| CacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let record: Value = serde_json::from_str(&contents).map_err(|source| CacheError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let raw = record
        .get("expiresAt")
        .and_then(Value::as_str)
        .ok_or_else(|| CacheError::Deserialization("missing expiresAt".to_string()))?;

    parse_timestamp(raw)
        .ok_or_else(|| CacheError::Deserialization(format!("invalid expiresAt: {raw}")))
}
