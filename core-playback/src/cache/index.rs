//! In-memory index of committed cache entries, kept in access order.

use lru::LruCache;
use serde::{Deserialize, Serialize};

/// One committed cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedContent {
    pub key: String,
    /// Blob file name relative to the cache directory
    pub file_name: String,
    pub length: u64,
    /// Last read or write, unix millis
    pub last_touch_ms: i64,
}

/// Serialized form of the index (`cache_index.json`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    pub entries: Vec<CachedContent>,
}

pub(crate) const INDEX_VERSION: u32 = 1;

/// Access-ordered map from cache key to entry with a running byte total.
///
/// The LRU list is unbounded; capacity is enforced by a
/// [`CacheEvictor`](super::evictor::CacheEvictor).
#[derive(Debug)]
pub struct CacheIndex {
    entries: LruCache<String, CachedContent>,
    total_bytes: u64,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            total_bytes: 0,
        }
    }

    /// Rebuild from a snapshot; entries are replayed oldest touch first.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        let mut entries = snapshot.entries;
        entries.sort_by_key(|entry| entry.last_touch_ms);

        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        // LruCache iterates most recent first
        let mut entries: Vec<CachedContent> =
            self.entries.iter().map(|(_, entry)| entry.clone()).collect();
        entries.reverse();
        IndexSnapshot {
            version: INDEX_VERSION,
            entries,
        }
    }

    /// Look up without changing recency.
    pub fn get(&self, key: &str) -> Option<&CachedContent> {
        self.entries.peek(key)
    }

    /// Mark as most recently used and return the updated entry.
    pub fn touch(&mut self, key: &str, now_ms: i64) -> Option<CachedContent> {
        let entry = self.entries.get_mut(key)?;
        entry.last_touch_ms = now_ms;
        Some(entry.clone())
    }

    /// Insert or replace; returns the replaced entry.
    pub fn insert(&mut self, entry: CachedContent) -> Option<CachedContent> {
        self.total_bytes += entry.length;
        let previous = self.entries.put(entry.key.clone(), entry);
        if let Some(old) = &previous {
            self.total_bytes -= old.length;
        }
        previous
    }

    pub fn remove(&mut self, key: &str) -> Option<CachedContent> {
        let removed = self.entries.pop(key)?;
        self.total_bytes -= removed.length;
        Some(removed)
    }

    /// Remove and return the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<CachedContent> {
        let (_, removed) = self.entries.pop_lru()?;
        self.total_bytes -= removed.length;
        Some(removed)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self::new()
    }
}
