//! Read-through cache in front of an upstream data source.
//!
//! On open the cache is consulted under the resolved key. A hit is served
//! from disk; a miss is read from upstream and, for whole-resource requests,
//! written to the cache as it streams. The entry is committed when upstream
//! reaches end of input and abandoned on close or error.
//!
//! With [`CacheFlags::ignore_cache_on_error`] any cache fault (open, read,
//! write, commit) is logged and the request continues from upstream; a fault
//! in the middle of a cached read drops the entry and reopens upstream at the
//! current position.

use crate::cache::key::CacheKeyResolver;
use crate::cache::store::{Cache, CacheReader, CacheWriter};
use crate::datasource::{DataSource, DataSourceFactory, DataSpec};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Behaviour switches for [`CacheDataSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheFlags {
    /// Serve from upstream instead of failing when the cache misbehaves.
    pub ignore_cache_on_error: bool,
    /// Do not write to the cache when upstream cannot report a length.
    pub ignore_cache_for_unset_length: bool,
}

impl CacheFlags {
    pub fn ignore_cache_on_error() -> Self {
        Self {
            ignore_cache_on_error: true,
            ..Default::default()
        }
    }
}

/// Builds [`CacheDataSource`]s sharing one cache and one upstream factory.
#[derive(Clone)]
pub struct CacheDataSourceFactory {
    cache: Arc<dyn Cache>,
    upstream: Arc<dyn DataSourceFactory>,
    key_resolver: Option<Arc<dyn CacheKeyResolver>>,
    flags: CacheFlags,
    event_bus: Option<EventBus>,
}

impl CacheDataSourceFactory {
    pub fn new(cache: Arc<dyn Cache>, upstream: Arc<dyn DataSourceFactory>) -> Self {
        Self {
            cache,
            upstream,
            key_resolver: None,
            flags: CacheFlags::default(),
            event_bus: None,
        }
    }

    pub fn with_key_resolver(mut self, resolver: Arc<dyn CacheKeyResolver>) -> Self {
        self.key_resolver = Some(resolver);
        self
    }

    pub fn with_flags(mut self, flags: CacheFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn upstream(&self) -> &Arc<dyn DataSourceFactory> {
        &self.upstream
    }

    pub fn flags(&self) -> CacheFlags {
        self.flags
    }

    pub fn has_key_resolver(&self) -> bool {
        self.key_resolver.is_some()
    }

    pub fn create_cache_data_source(&self) -> CacheDataSource {
        CacheDataSource {
            factory: self.clone(),
            spec: None,
            key: String::new(),
            cached: None,
            upstream: None,
            writer: None,
            bytes_read: 0,
            bypass_cache: false,
        }
    }
}

impl DataSourceFactory for CacheDataSourceFactory {
    fn create_data_source(&self) -> Box<dyn DataSource> {
        Box::new(self.create_cache_data_source())
    }
}

impl fmt::Debug for CacheDataSourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDataSourceFactory")
            .field("cache", &self.cache)
            .field("upstream", &self.upstream)
            .field("has_key_resolver", &self.key_resolver.is_some())
            .field("flags", &self.flags)
            .finish()
    }
}

/// Cache key for `spec`: the resolver's answer when one is set, otherwise
/// the spec's own key, otherwise the URI.
pub fn cache_key_for(resolver: Option<&Arc<dyn CacheKeyResolver>>, spec: &DataSpec) -> String {
    match resolver {
        Some(resolver) => resolver.resolve_key(&spec.uri),
        None => spec.key.clone().unwrap_or_else(|| spec.uri.clone()),
    }
}

pub struct CacheDataSource {
    factory: CacheDataSourceFactory,
    spec: Option<DataSpec>,
    key: String,
    cached: Option<Box<dyn CacheReader>>,
    upstream: Option<Box<dyn DataSource>>,
    writer: Option<Box<dyn CacheWriter>>,
    // Bytes returned since open
    bytes_read: u64,
    // Set after an ignored fault; the rest of this request skips the cache
    bypass_cache: bool,
}

impl CacheDataSource {
    /// Whether the open request is being served from disk.
    pub fn is_reading_from_cache(&self) -> bool {
        self.cached.is_some()
    }

    /// Swallow a cache fault when the flags allow it.
    fn on_cache_error(&mut self, err: PlaybackError) -> Result<()> {
        if !self.factory.flags.ignore_cache_on_error {
            return Err(err);
        }

        warn!("Cache fault for {}, continuing from network: {}", self.key, err);
        self.bypass_cache = true;
        if let Some(bus) = &self.factory.event_bus {
            let _ = bus.emit(CoreEvent::Cache(CacheEvent::FellBackToNetwork {
                key: self.key.clone(),
                message: err.to_string(),
            }));
        }
        Ok(())
    }

    async fn open_upstream(&mut self, spec: &DataSpec) -> Result<Option<u64>> {
        let mut upstream = self.factory.upstream.create_data_source();
        let length = upstream.open(spec).await?;
        self.upstream = Some(upstream);
        Ok(length)
    }

    /// Forget an entry that failed mid-read so the next miss re-caches it.
    async fn drop_broken_entry(&mut self) {
        match self.factory.cache.remove(&self.key).await {
            Ok(true) => debug!("Dropped unreadable cache entry {}", self.key),
            Ok(false) => {}
            Err(e) => warn!("Failed to drop cache entry {}: {}", self.key, e),
        }
    }

    async fn abandon_write(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abandon().await;
        }
    }

    async fn read_cached(&mut self, max_len: usize) -> Result<Option<Option<Bytes>>> {
        let Some(reader) = self.cached.as_mut() else {
            return Ok(None);
        };

        let result = reader.read(max_len).await;
        match result {
            Ok(chunk) => Ok(Some(chunk)),
            Err(e) => {
                self.cached = None;
                self.drop_broken_entry().await;
                self.on_cache_error(e)?;

                let Some(spec) = self.spec.clone() else {
                    return Ok(Some(None));
                };
                debug!(
                    "Reopening upstream for {} at offset {}",
                    self.key, self.bytes_read
                );
                self.open_upstream(&spec.subrange(self.bytes_read)).await?;
                Ok(None)
            }
        }
    }

    async fn read_upstream(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };

        let result = upstream.read(max_len).await;
        let chunk = match result {
            Ok(chunk) => chunk,
            Err(e) => {
                self.abandon_write().await;
                return Err(e);
            }
        };

        match &chunk {
            Some(data) => {
                let written = match self.writer.as_mut() {
                    Some(writer) => writer.write(data).await,
                    None => Ok(()),
                };
                if let Err(e) = written {
                    self.abandon_write().await;
                    self.on_cache_error(e)?;
                }
            }
            None => {
                if let Some(writer) = self.writer.take() {
                    let written = writer.bytes_written();
                    match writer.commit().await {
                        Ok(()) => debug!("Cached {} ({} bytes)", self.key, written),
                        Err(e) => self.on_cache_error(e)?,
                    }
                }
            }
        }

        Ok(chunk)
    }
}

#[async_trait]
impl DataSource for CacheDataSource {
    async fn open(&mut self, spec: &DataSpec) -> Result<Option<u64>> {
        self.close().await;

        self.key = cache_key_for(self.factory.key_resolver.as_ref(), spec);
        self.spec = Some(spec.clone());
        self.bypass_cache = false;

        let key = self.key.clone();
        let lookup = self.factory.cache.read(&key, spec.position).await;
        match lookup {
            Ok(Some(reader)) => {
                let available = reader.remaining();
                let length = spec.length.map_or(available, |l| l.min(available));
                debug!("Cache hit for {} ({} bytes)", self.key, length);
                self.cached = Some(reader);
                return Ok(Some(length));
            }
            Ok(None) => debug!("Cache miss for {}", self.key),
            Err(e) => self.on_cache_error(e)?,
        }

        let length = self.open_upstream(spec).await?;

        let cacheable = spec.is_whole_resource()
            && !(self.factory.flags.ignore_cache_for_unset_length && length.is_none());
        if cacheable && !self.bypass_cache {
            let started = self.factory.cache.start_write(&key).await;
            match started {
                Ok(writer) => self.writer = Some(writer),
                Err(e) => self.on_cache_error(e)?,
            }
        }

        Ok(length)
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        if max_len == 0 {
            return Ok(None);
        }

        if let Some(from_cache) = self.read_cached(max_len).await? {
            let chunk = match (from_cache, self.spec.as_ref().and_then(|s| s.length)) {
                (Some(mut data), Some(limit)) => {
                    let left = limit.saturating_sub(self.bytes_read);
                    if left == 0 {
                        None
                    } else {
                        data.truncate(usize::try_from(left).unwrap_or(usize::MAX).min(data.len()));
                        Some(data)
                    }
                }
                (chunk, _) => chunk,
            };
            if let Some(data) = &chunk {
                self.bytes_read += data.len() as u64;
            }
            return Ok(chunk);
        }

        let chunk = self.read_upstream(max_len).await?;
        if let Some(data) = &chunk {
            self.bytes_read += data.len() as u64;
        }
        Ok(chunk)
    }

    async fn close(&mut self) {
        self.abandon_write().await;
        if let Some(mut upstream) = self.upstream.take() {
            upstream.close().await;
        }
        self.cached = None;
        self.spec = None;
        self.bytes_read = 0;
    }

    fn uri(&self) -> Option<&str> {
        self.spec.as_ref().map(|spec| spec.uri.as_str())
    }
}
