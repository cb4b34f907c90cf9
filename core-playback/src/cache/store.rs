//! # Disk Cache
//!
//! Content-addressed blob store with a persisted LRU index.
//!
//! ## Layout
//!
//! ```text
//! <directory>/
//!   cache_index.json          serialized CacheIndex
//!   <sha256(key)>.blob        committed entry
//!   <sha256(key)>.<uuid>.tmp  write in progress
//! ```
//!
//! A write becomes visible only on `commit()`, which renames the temporary
//! file into place, runs the evictor and persists the index. Stale `.tmp`
//! files left by a crash are deleted on open.

use crate::cache::evictor::CacheEvictor;
use crate::cache::index::{CacheIndex, CachedContent, IndexSnapshot};
use crate::cache::stats::{CacheCounters, CacheStats};
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bridge_traits::time::Clock;
use bytes::{Bytes, BytesMut};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const INDEX_FILE: &str = "cache_index.json";
const BLOB_EXTENSION: &str = "blob";
const TMP_EXTENSION: &str = "tmp";

/// A byte cache keyed by string.
#[async_trait]
pub trait Cache: Send + Sync + fmt::Debug {
    /// Unique per opened instance; two handles with the same uid share state.
    fn uid(&self) -> Uuid;

    fn directory(&self) -> &Path;

    fn max_bytes(&self) -> u64;

    /// Entry metadata without touching recency.
    fn lookup(&self, key: &str) -> Option<CachedContent>;

    /// Open a committed entry at `position`. `Ok(None)` is a miss.
    async fn read(&self, key: &str, position: u64) -> Result<Option<Box<dyn CacheReader>>>;

    /// Begin writing a new entry for `key`. Nothing is visible until commit.
    async fn start_write(&self, key: &str) -> Result<Box<dyn CacheWriter>>;

    /// Remove an entry. Returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    fn keys(&self) -> Vec<String>;

    /// Bytes held by committed entries.
    fn cache_space(&self) -> u64;

    fn stats(&self) -> CacheStats;
}

/// Sequential reader over one committed entry.
#[async_trait]
pub trait CacheReader: Send {
    /// Bytes left from the opened position.
    fn remaining(&self) -> u64;

    /// Next chunk of at most `max_len` bytes; `None` at the end of the entry.
    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>>;
}

/// Pending entry.
#[async_trait]
pub trait CacheWriter: Send {
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    fn bytes_written(&self) -> u64;

    /// Publish the entry. Oversize entries are dropped silently.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard the pending bytes.
    async fn abandon(self: Box<Self>);
}

/// Disk-backed [`Cache`] owning one directory.
///
/// Cloning is cheap; clones share the index and counters.
#[derive(Clone)]
pub struct SimpleCache {
    inner: Arc<Inner>,
}

struct Inner {
    uid: Uuid,
    directory: PathBuf,
    evictor: Box<dyn CacheEvictor>,
    index: parking_lot::Mutex<CacheIndex>,
    // Serializes index file writes
    persist_lock: tokio::sync::Mutex<()>,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
    event_bus: Option<EventBus>,
}

impl SimpleCache {
    /// Open (or create) a cache in `directory`.
    ///
    /// Loads `cache_index.json` when present; a corrupt index is discarded and
    /// the cache starts empty.
    ///
    /// # Errors
    ///
    /// `Cache` if the directory cannot be created.
    pub fn open(
        directory: impl Into<PathBuf>,
        evictor: Box<dyn CacheEvictor>,
        clock: Arc<dyn Clock>,
        event_bus: Option<EventBus>,
    ) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)
            .map_err(|e| cache_io(&format!("create {}", directory.display()), e))?;

        remove_stale_temp_files(&directory);

        let mut index = load_index(&directory);
        let victims = evictor.on_start_file(&mut index, 0);
        for victim in &victims {
            let _ = std::fs::remove_file(directory.join(&victim.file_name));
        }
        if !victims.is_empty() {
            info!(
                "Trimmed {} entries over capacity in {:?}",
                victims.len(),
                directory
            );
        }

        debug!(
            "Opened cache at {:?} with {} entries ({} bytes)",
            directory,
            index.len(),
            index.total_bytes()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                uid: Uuid::new_v4(),
                directory,
                evictor,
                index: parking_lot::Mutex::new(index),
                persist_lock: tokio::sync::Mutex::new(()),
                clock,
                counters: CacheCounters::default(),
                event_bus,
            }),
        })
    }
}

impl fmt::Debug for SimpleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleCache")
            .field("uid", &self.inner.uid)
            .field("directory", &self.inner.directory)
            .field("max_bytes", &self.inner.evictor.max_bytes())
            .finish()
    }
}

#[async_trait]
impl Cache for SimpleCache {
    fn uid(&self) -> Uuid {
        self.inner.uid
    }

    fn directory(&self) -> &Path {
        &self.inner.directory
    }

    fn max_bytes(&self) -> u64 {
        self.inner.evictor.max_bytes()
    }

    fn lookup(&self, key: &str) -> Option<CachedContent> {
        self.inner.index.lock().get(key).cloned()
    }

    #[instrument(skip(self))]
    async fn read(&self, key: &str, position: u64) -> Result<Option<Box<dyn CacheReader>>> {
        let now = self.inner.clock.unix_timestamp_millis();
        let touched = self.inner.index.lock().touch(key, now);
        let Some(entry) = touched else {
            self.inner.counters.record_miss();
            return Ok(None);
        };

        let path = self.inner.directory.join(&entry.file_name);
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Cache entry {} lost its blob file, dropping it", key);
                self.inner.index.lock().remove(key);
                self.inner.counters.record_miss();
                return Ok(None);
            }
            Err(e) => return Err(cache_io(&format!("open {}", path.display()), e)),
        };

        let position = position.min(entry.length);
        if position > 0 {
            file.seek(SeekFrom::Start(position))
                .await
                .map_err(|e| cache_io("seek", e))?;
        }

        self.inner.counters.record_hit();
        Ok(Some(Box::new(FileCacheReader {
            file,
            remaining: entry.length - position,
        })))
    }

    async fn start_write(&self, key: &str) -> Result<Box<dyn CacheWriter>> {
        let tmp_path = self.inner.directory.join(format!(
            "{}.{}.{}",
            key_hash(key),
            Uuid::new_v4().simple(),
            TMP_EXTENSION
        ));
        let file = File::create(&tmp_path)
            .await
            .map_err(|e| cache_io(&format!("create {}", tmp_path.display()), e))?;

        debug!("Started cache write for {}", key);

        Ok(Box::new(FileCacheWriter {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            tmp_path,
            file: Some(file),
            written: 0,
        }))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let removed = self.inner.index.lock().remove(key);
        let Some(removed) = removed else {
            return Ok(false);
        };

        let path = self.inner.directory.join(&removed.file_name);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to delete cache file {:?}: {}", path, e);
            }
        }

        self.inner.persist_index().await?;
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.index.lock().keys()
    }

    fn cache_space(&self) -> u64 {
        self.inner.index.lock().total_bytes()
    }

    fn stats(&self) -> CacheStats {
        let mut stats = {
            let index = self.inner.index.lock();
            CacheStats {
                entries: index.len(),
                total_bytes: index.total_bytes(),
                max_bytes: self.inner.evictor.max_bytes(),
                calculated_at: self.inner.clock.unix_timestamp_millis(),
                ..Default::default()
            }
        };
        self.inner.counters.fill(&mut stats);
        stats
    }
}

impl Inner {
    async fn persist_index(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;

        let snapshot = self.index.lock().snapshot();
        let json = serde_json::to_vec(&snapshot)?;

        let path = self.directory.join(INDEX_FILE);
        let tmp = self.directory.join(format!("{}.{}", INDEX_FILE, TMP_EXTENSION));
        fs::write(&tmp, json)
            .await
            .map_err(|e| cache_io("write index", e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| cache_io("replace index", e))?;
        Ok(())
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }
}

struct FileCacheReader {
    file: File,
    remaining: u64,
}

#[async_trait]
impl CacheReader for FileCacheReader {
    fn remaining(&self) -> u64 {
        self.remaining
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        if self.remaining == 0 || max_len == 0 {
            return Ok(None);
        }

        let want = max_len.min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let mut buf = BytesMut::zeroed(want);
        let n = self
            .file
            .read(&mut buf[..])
            .await
            .map_err(|e| cache_io("read", e))?;
        if n == 0 {
            return Err(PlaybackError::Cache(format!(
                "blob truncated with {} bytes outstanding",
                self.remaining
            )));
        }

        buf.truncate(n);
        self.remaining -= n as u64;
        Ok(Some(buf.freeze()))
    }
}

struct FileCacheWriter {
    inner: Arc<Inner>,
    key: String,
    tmp_path: PathBuf,
    // None once the entry outgrew the cache
    file: Option<File>,
    written: u64,
}

#[async_trait]
impl CacheWriter for FileCacheWriter {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            self.written += data.len() as u64;
            return Ok(());
        };

        self.written += data.len() as u64;
        if !self.inner.evictor.accepts(self.written) {
            debug!(
                "Entry {} exceeds cache capacity, no longer caching it",
                self.key
            );
            self.file = None;
            let _ = fs::remove_file(&self.tmp_path).await;
            return Ok(());
        }

        file.write_all(data)
            .await
            .map_err(|e| cache_io("write", e))
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush().await.map_err(|e| cache_io("flush", e))?;
        drop(file);

        let inner = Arc::clone(&self.inner);
        let file_name = format!("{}.{}", key_hash(&self.key), BLOB_EXTENSION);
        let final_path = inner.directory.join(&file_name);
        fs::rename(&self.tmp_path, &final_path)
            .await
            .map_err(|e| cache_io("publish blob", e))?;

        let victims = {
            let mut index = inner.index.lock();
            // Same key maps to the same blob, which the rename just replaced
            index.remove(&self.key);
            let victims = inner.evictor.on_start_file(&mut index, self.written);
            index.insert(CachedContent {
                key: self.key.clone(),
                file_name,
                length: self.written,
                last_touch_ms: inner.clock.unix_timestamp_millis(),
            });
            victims
        };

        inner.counters.record_write();
        if !victims.is_empty() {
            inner.counters.record_evictions(victims.len() as u64);
        }
        for victim in victims {
            let path = inner.directory.join(&victim.file_name);
            if let Err(e) = fs::remove_file(&path).await {
                warn!("Failed to delete evicted file {:?}: {}", path, e);
            }
            debug!("Evicted {} ({} bytes)", victim.key, victim.length);
            inner.emit(CacheEvent::Evicted {
                key: victim.key,
                length: victim.length,
            });
        }

        debug!("Committed {} ({} bytes)", self.key, self.written);
        inner.persist_index().await
    }

    async fn abandon(mut self: Box<Self>) {
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.tmp_path).await;
            debug!("Abandoned cache write for {}", self.key);
        }
    }
}

impl Drop for FileCacheWriter {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

fn key_hash(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn cache_io(context: &str, err: std::io::Error) -> PlaybackError {
    PlaybackError::Cache(format!("{}: {}", context, err))
}

fn load_index(directory: &Path) -> CacheIndex {
    let path = directory.join(INDEX_FILE);
    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return CacheIndex::new(),
        Err(e) => {
            warn!("Failed to read cache index {:?}: {}", path, e);
            return CacheIndex::new();
        }
    };

    match serde_json::from_slice::<IndexSnapshot>(&raw) {
        Ok(snapshot) => CacheIndex::from_snapshot(snapshot),
        Err(e) => {
            warn!("Discarding corrupt cache index {:?}: {}", path, e);
            CacheIndex::new()
        }
    }
}

fn remove_stale_temp_files(directory: &Path) {
    let Ok(entries) = std::fs::read_dir(directory) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(TMP_EXTENSION) {
            let _ = std::fs::remove_file(&path);
        }
    }
}
