use crate::cache::index::{CacheIndex, CachedContent};
use std::fmt::Debug;

/// Decides which entries leave the cache when a new one is committed.
pub trait CacheEvictor: Send + Sync + Debug {
    /// Capacity in bytes.
    fn max_bytes(&self) -> u64;

    /// Whether an entry of `length` bytes may be cached at all.
    fn accepts(&self, length: u64) -> bool {
        length <= self.max_bytes()
    }

    /// Called before an entry of `incoming` bytes is inserted. Removes and
    /// returns the victims; the caller deletes their files.
    fn on_start_file(&self, index: &mut CacheIndex, incoming: u64) -> Vec<CachedContent>;
}

/// Evicts least recently used entries until the incoming entry fits.
#[derive(Debug, Clone, Copy)]
pub struct LeastRecentlyUsedCacheEvictor {
    max_bytes: u64,
}

impl LeastRecentlyUsedCacheEvictor {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl CacheEvictor for LeastRecentlyUsedCacheEvictor {
    fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn on_start_file(&self, index: &mut CacheIndex, incoming: u64) -> Vec<CachedContent> {
        let mut evicted = Vec::new();
        while index.total_bytes() + incoming > self.max_bytes {
            match index.pop_lru() {
                Some(victim) => evicted.push(victim),
                None => break,
            }
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, length: u64) -> CachedContent {
        CachedContent {
            key: key.to_string(),
            file_name: format!("{}.blob", key),
            length,
            last_touch_ms: 0,
        }
    }

    #[test]
    fn test_evicts_oldest_until_fit() {
        let evictor = LeastRecentlyUsedCacheEvictor::new(100);
        let mut index = CacheIndex::new();
        index.insert(entry("a", 40));
        index.insert(entry("b", 40));
        index.insert(entry("c", 20));

        let evicted = evictor.on_start_file(&mut index, 50);
        let keys: Vec<_> = evicted.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(index.total_bytes(), 20);
    }

    #[test]
    fn test_no_eviction_when_space_left() {
        let evictor = LeastRecentlyUsedCacheEvictor::new(100);
        let mut index = CacheIndex::new();
        index.insert(entry("a", 40));

        assert!(evictor.on_start_file(&mut index, 60).is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_accepts() {
        let evictor = LeastRecentlyUsedCacheEvictor::new(100);
        assert!(evictor.accepts(100));
        assert!(!evictor.accepts(101));
    }
}
