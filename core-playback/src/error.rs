//! # Playback Error Types
//!
//! Error types for media source resolution, the data-source chain and the
//! playback adapter.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while resolving or reading media.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// Empty or unparseable URI, or a configuration value out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// Disk cache read/write fault.
    ///
    /// With `ignore_cache_on_error` set these never escape the cache data
    /// source; the request is served from upstream instead.
    #[error("Cache error: {0}")]
    Cache(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Network failure below the HTTP status layer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Host bridge failure.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache index could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========================================================================
    // Adapter Errors
    // ========================================================================
    /// `init_player` has not been called, or the player was released.
    #[error("Playback engine not initialized")]
    EngineNotInitialized,

    /// `prepare_async` was called before `set_data_source`.
    #[error("No media source set")]
    NoMediaSource,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Transport(_) => true,
            PlaybackError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            PlaybackError::Bridge(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` for storage faults raised by the disk cache.
    pub fn is_cache_fault(&self) -> bool {
        matches!(self, PlaybackError::Cache(_))
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::Transport(_)
                | PlaybackError::HttpStatus { .. }
                | PlaybackError::Bridge(
                    BridgeError::Connection(_)
                        | BridgeError::Timeout(_)
                        | BridgeError::RedirectRejected { .. }
                )
        )
    }
}

impl From<serde_json::Error> for PlaybackError {
    fn from(e: serde_json::Error) -> Self {
        PlaybackError::Serialization(e.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
