//! Process-wide registry of open disk caches.
//!
//! Two caches must never own the same directory at the same time, so every
//! consumer obtains its cache here. Instances are keyed by the absolute
//! directory path together with the capacity; asking again for the same pair
//! returns the same instance.

use crate::cache::config::{CacheConfig, DEFAULT_CACHE_MAX_BYTES};
use crate::cache::evictor::LeastRecentlyUsedCacheEvictor;
use crate::cache::store::{Cache, SimpleCache};
use crate::error::{PlaybackError, Result};
use bridge_traits::time::Clock;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of open caches keyed by `<absolute dir>_<max bytes>`.
pub struct CacheRegistry {
    caches: Mutex<HashMap<String, Arc<dyn Cache>>>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
}

impl CacheRegistry {
    pub fn new(clock: Arc<dyn Clock>, event_bus: Option<EventBus>) -> Self {
        Self {
            caches: Mutex::new(HashMap::new()),
            clock,
            event_bus,
        }
    }

    /// Return the cache for `(directory, max_bytes)`, opening it on first use.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `max_bytes` is 0; `Cache` when the directory
    /// cannot be created.
    pub fn get_or_create(&self, directory: &Path, max_bytes: u64) -> Result<Arc<dyn Cache>> {
        if max_bytes == 0 {
            return Err(PlaybackError::InvalidArgument(
                "cache max bytes must be greater than 0".to_string(),
            ));
        }

        let absolute = absolute_dir(directory)?;
        let key = registry_key(&absolute, max_bytes);

        let mut caches = self.caches.lock();
        if let Some(existing) = caches.get(&key) {
            return Ok(Arc::clone(existing));
        }

        if let Some(other) = caches
            .values()
            .find(|cache| cache.directory() == absolute.as_path())
        {
            warn!(
                "Cache directory {:?} already open with {} bytes, opening a second instance with {} bytes",
                absolute,
                other.max_bytes(),
                max_bytes
            );
        }

        let cache: Arc<dyn Cache> = Arc::new(SimpleCache::open(
            absolute.clone(),
            Box::new(LeastRecentlyUsedCacheEvictor::new(max_bytes)),
            Arc::clone(&self.clock),
            self.event_bus.clone(),
        )?);
        caches.insert(key, Arc::clone(&cache));
        drop(caches);

        info!("Created cache at {:?} ({} bytes)", absolute, max_bytes);
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(CacheEvent::Created {
                directory: absolute,
                max_bytes,
            }));
        }

        Ok(cache)
    }

    /// Cache for an optional config. Without a config, or without a directory
    /// in it, `default_dir` is used; without a config the capacity is 512 MiB.
    pub fn resolve(
        &self,
        config: Option<&CacheConfig>,
        default_dir: &Path,
    ) -> Result<Arc<dyn Cache>> {
        let directory = config.and_then(|c| c.cache_dir()).unwrap_or(default_dir);
        let max_bytes = config.map_or(DEFAULT_CACHE_MAX_BYTES, |c| c.cache_max_bytes());
        self.get_or_create(directory, max_bytes)
    }

    pub fn contains(&self, directory: &Path, max_bytes: u64) -> bool {
        match absolute_dir(directory) {
            Ok(absolute) => self
                .caches
                .lock()
                .contains_key(&registry_key(&absolute, max_bytes)),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("caches", &self.caches.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn absolute_dir(directory: &Path) -> Result<PathBuf> {
    std::path::absolute(directory).map_err(|e| {
        PlaybackError::InvalidArgument(format!(
            "cannot resolve cache directory {:?}: {}",
            directory, e
        ))
    })
}

/// Registry key for an already absolute directory.
pub fn registry_key(absolute: &Path, max_bytes: u64) -> String {
    format!("{}_{}", absolute.display(), max_bytes)
}
