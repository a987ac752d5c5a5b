//! Cache store implementations
//!
//! Stores hold immutable JSON values with expiry timestamps. Expired entries
//! are still returned (with `is_expired = true`) so the caller decides
//! whether stale data is better than nothing; the observation gateway treats
//! expired entries as misses and refetches.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// On-disk / in-map representation of one cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Result of a cache read, including freshness metadata
#[derive(Debug, Clone)]
pub struct CachedValue {
    /// The cached JSON value
    pub data: Value,
    /// When the value was originally cached
    pub cached_at: DateTime<Utc>,
    /// Whether the TTL has elapsed
    pub is_expired: bool,
}

/// Read/write interface shared by all cache backends
///
/// Values are immutable once written for a given key, so a lost race between
/// two concurrent writers is wasted work rather than a correctness problem.
pub trait CacheStore: Send + Sync {
    /// Reads a value; `None` means the key was never written (or the entry
    /// is unreadable).
    fn read(&self, key: &str) -> Option<CachedValue>;

    /// Writes a value with the given time-to-live.
    fn write(&self, key: &str, data: Value, ttl: Duration);
}

/// File-backed store keeping one JSON file per key in an XDG cache directory
///
/// Write failures are logged and swallowed: a broken cache degrades to
/// upstream calls, it must not fail the request.
#[derive(Debug, Clone)]
pub struct FileStore {
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a store under the XDG cache directory
    /// (`~/.cache/rainbowcast/` on Linux). Returns `None` when no home
    /// directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "rainbowcast")?;
        Some(Self {
            cache_dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a store rooted at a specific directory.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys contain ':' separators; keep file names portable.
        let file = key.replace([':', '/'], "_");
        self.cache_dir.join(format!("{}.json", file))
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &str) -> Option<CachedValue> {
        let content = fs::read_to_string(self.entry_path(key)).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;

        Some(CachedValue {
            is_expired: Utc::now() > entry.expires_at,
            data: entry.data,
            cached_at: entry.cached_at,
        })
    }

    fn write(&self, key: &str, data: Value, ttl: Duration) {
        let now = Utc::now();
        let entry = CacheEntry {
            data,
            cached_at: now,
            expires_at: now + ttl,
        };

        if let Err(err) = fs::create_dir_all(&self.cache_dir)
            .and_then(|_| fs::write(self.entry_path(key), entry_json(&entry)))
        {
            tracing::warn!(key, error = %err, "cache write failed");
        }
    }
}

fn entry_json(entry: &CacheEntry) -> Vec<u8> {
    serde_json::to_vec_pretty(entry).unwrap_or_default()
}

/// Process-local store backed by a mutex-guarded map
///
/// Used by tests and offline mode; safe under concurrent read/write with
/// last-write-wins semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Option<CachedValue> {
        // Entries are immutable last-write-wins values, so a poisoned lock
        // still guards a consistent map; keep serving.
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;

        Some(CachedValue {
            data: entry.data.clone(),
            cached_at: entry.cached_at,
            is_expired: Utc::now() > entry.expires_at,
        })
    }

    fn write(&self, key: &str, data: Value, ttl: Duration) {
        let now = Utc::now();
        let entry = CacheEntry {
            data,
            cached_at: now,
            expires_at: now + ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry);
    }
}
