//! # Playback Source Module
//!
//! Turns media URIs into playable sources and adapts an external playback
//! engine to a simple player interface.
//!
//! ## Overview
//!
//! This module handles:
//! - Content classification (DASH, HLS, RTMP, RTSP, progressive)
//! - Data source chains over HTTP and local files
//! - Request header injection with user-agent routing
//! - A disk cache shared per (directory, capacity) with LRU eviction
//! - The [`MediaPlayer`] adapter and its event relay

pub mod cache;
pub mod classifier;
pub mod config;
pub mod datasource;
pub mod error;
pub mod factory;
pub mod headers;
pub mod media_item;
pub mod media_source;
pub mod player;
pub mod source_helper;
pub mod traits;

pub use cache::{CacheConfig, CacheConfigBuilder, CacheKeyResolver, CacheRegistry, CacheStats};
pub use classifier::{classify, ContentType};
pub use config::SourceHelperConfig;
pub use error::{PlaybackError, Result};
pub use factory::{MediaPlayerFactory, PlayerFactory};
pub use headers::HeaderInjector;
pub use media_item::MediaItem;
pub use media_source::{MediaSource, MediaSourceFactory, Protocol, SourceUpstream};
pub use player::MediaPlayer;
pub use source_helper::MediaSourceHelper;
pub use traits::{
    EngineError, EngineFactory, EngineListener, EngineState, PlaybackAdapter, PlaybackEngine,
    PlaybackParameters, PlayerEventListener, RepeatMode, SurfaceHandle, VideoSize,
};
