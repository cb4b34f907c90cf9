//! # Media Cache Module
//!
//! Disk cache for media bytes fetched over HTTP.
//!
//! ## Overview
//!
//! - [`CacheConfig`]: per-player switch, directory, capacity and key resolver
//! - [`CacheRegistry`]: one [`SimpleCache`] per (directory, capacity) pair
//! - [`SimpleCache`]: blob store with a persisted LRU index
//! - [`CacheKeyResolver`]: maps request URIs to cache keys
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │     CacheRegistry          │
//! │  - get_or_create()         │
//! └────────┬───────────────────┘
//!          │ Arc<SimpleCache>
//!          ▼
//! ┌────────────────────────────┐
//! │     SimpleCache            │
//! │  - read() / start_write()  │
//! └────────┬───────────────────┘
//!          ├──> CacheIndex (lru)
//!          └──> CacheEvictor (LRU)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, CacheRegistry, Cache};
//!
//! let registry = CacheRegistry::new(clock, None);
//! let cache = registry.get_or_create(&dir, 512 * 1024 * 1024)?;
//! if let Some(mut reader) = cache.read("https://cdn/v.mp4", 0).await? {
//!     while let Some(chunk) = reader.read(64 * 1024).await? { /* ... */ }
//! }
//! ```

pub mod config;
pub mod evictor;
pub mod index;
pub mod key;
pub mod registry;
pub mod stats;
pub mod store;

pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_CACHE_MAX_BYTES};
pub use evictor::{CacheEvictor, LeastRecentlyUsedCacheEvictor};
pub use index::{CacheIndex, CachedContent};
pub use key::{
    CacheKeyResolver, IgnoreQueryParamsKeyResolver, StripQueryKeyResolver, UriKeyResolver,
};
pub use registry::CacheRegistry;
pub use stats::CacheStats;
pub use store::{Cache, CacheReader, CacheWriter, SimpleCache};
