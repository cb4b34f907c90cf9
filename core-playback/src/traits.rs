//! # Core Playback Traits
//!
//! Abstractions at the boundary between the player adapter and the media
//! engine that actually demuxes, decodes and renders.
//!
//! ## Architecture
//!
//! ```text
//!  app ──PlaybackAdapter──> MediaPlayer ──PlaybackEngine──> engine
//!  app <─PlayerEventListener── relay <──EngineListener──── engine
//! ```
//!
//! - [`PlaybackEngine`]: the external engine. Takes a [`MediaSource`], reports
//!   state changes to registered [`EngineListener`]s.
//! - [`PlaybackAdapter`]: the player surface offered to applications.
//! - [`PlayerEventListener`]: application callbacks.
//!
//! ## Threading Model
//!
//! Engines may call listeners from their own threads, so every trait here is
//! `Send + Sync` and engine methods take `&self`.

use crate::error::Result;
use crate::media_source::MediaSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Engine Types
// ============================================================================

/// Engine playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// No media, or stopped
    Idle,
    /// Waiting for data
    Buffering,
    /// Able to play from the current position
    Ready,
    /// Reached the end of the media
    Ended,
}

/// Error reported by the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("engine error {code:?}: {message}")]
pub struct EngineError {
    pub code: Option<i32>,
    pub message: String,
}

impl EngineError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Decoded video dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation the renderer has not applied
    pub unapplied_rotation_degrees: u32,
    pub pixel_width_height_ratio: f32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            unapplied_rotation_degrees: 0,
            pixel_width_height_ratio: 1.0,
        }
    }

    pub fn with_rotation(mut self, degrees: u32) -> Self {
        self.unapplied_rotation_degrees = degrees;
        self
    }
}

/// Opaque native surface handle supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

/// Playback speed and pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackParameters {
    pub speed: f32,
    pub pitch: f32,
}

impl PlaybackParameters {
    pub fn new(speed: f32) -> Self {
        Self { speed, pitch: 1.0 }
    }
}

impl Default for PlaybackParameters {
    fn default() -> Self {
        Self::new(1.0)
    }
}

// ============================================================================
// Engine Traits
// ============================================================================

/// Callbacks from the engine.
pub trait EngineListener: Send + Sync {
    fn on_playback_state_changed(&self, state: EngineState);

    fn on_player_error(&self, error: &EngineError);

    fn on_video_size_changed(&self, size: VideoSize);
}

/// The external media engine.
pub trait PlaybackEngine: Send + Sync {
    fn add_listener(&self, listener: Arc<dyn EngineListener>);

    /// Remove a listener previously added (compared by pointer).
    fn remove_listener(&self, listener: &Arc<dyn EngineListener>);

    fn set_media_source(&self, source: MediaSource);

    fn prepare(&self);

    fn set_play_when_ready(&self, play_when_ready: bool);

    fn play_when_ready(&self) -> bool;

    fn playback_state(&self) -> EngineState;

    fn stop(&self);

    fn clear_media_items(&self);

    fn set_video_surface(&self, surface: Option<SurfaceHandle>);

    fn seek_to(&self, position: Duration);

    fn current_position(&self) -> Duration;

    /// `None` while unknown (live streams, before preparation).
    fn duration(&self) -> Option<Duration>;

    /// 0..=100
    fn buffered_percentage(&self) -> u8;

    /// 0.0..=1.0
    fn set_volume(&self, volume: f32);

    fn set_repeat_mode(&self, mode: RepeatMode);

    fn set_playback_parameters(&self, parameters: PlaybackParameters);

    fn release(&self);
}

/// Creates engines for new players.
pub trait EngineFactory: Send + Sync {
    fn create_engine(&self) -> Result<Arc<dyn PlaybackEngine>>;
}

// ============================================================================
// Application-facing Traits
// ============================================================================

/// Application callbacks relayed from the engine.
///
/// All methods default to no-ops.
pub trait PlayerEventListener: Send + Sync {
    /// First `Ready` after `prepare_async`.
    fn on_prepared(&self) {}

    fn on_rendering_start(&self) {}

    fn on_buffering_start(&self, _buffered_percent: u8) {}

    fn on_buffering_end(&self, _buffered_percent: u8) {}

    fn on_completion(&self) {}

    fn on_error(&self, _error: &EngineError) {}

    /// `rotation_degrees` is `Some` only for a positive unapplied rotation.
    fn on_video_size_changed(&self, _width: u32, _height: u32, _rotation_degrees: Option<u32>) {}
}

/// Player surface offered to applications.
///
/// Control methods are silent no-ops before `init_player` and after
/// `release`; queries return zero values.
pub trait PlaybackAdapter: Send {
    /// Create the engine, attach the relay, enable play-when-ready.
    fn init_player(&mut self) -> Result<()>;

    /// Resolve `path` into a media source for the next `prepare_async`.
    fn set_data_source(
        &mut self,
        path: &str,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<()>;

    fn set_event_listener(&mut self, listener: Arc<dyn PlayerEventListener>);

    fn start(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Hand the media source to the engine and start preparing.
    fn prepare_async(&mut self) -> Result<()>;

    fn reset(&mut self);

    fn is_playing(&self) -> bool;

    fn seek_to(&mut self, position: Duration);

    fn release(&mut self);

    fn current_position(&self) -> Duration;

    fn duration(&self) -> Duration;

    fn buffered_percentage(&self) -> u8;

    fn set_surface(&mut self, surface: Option<SurfaceHandle>);

    /// Both channels must be within 0.0..=1.0; the engine gets their mean.
    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    fn set_looping(&mut self, looping: bool);

    fn set_speed(&mut self, speed: f32) -> Result<()>;

    fn speed(&self) -> f32;

    /// Network throughput in bytes per second; not measured.
    fn tcp_speed(&self) -> u64;
}
