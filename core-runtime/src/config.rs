//! # Core Configuration Module
//!
//! Provides configuration management for the video player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and settings the playback core needs.
//! Validation is fail-fast: a missing capability is reported at `build()` time,
//! never when the first media source is resolved.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - network leaf of every data-source chain
//!   (desktop default: reqwest)
//! - cache root - parent directory of the default media cache
//!   (desktop default: the platform cache dir)
//!
//! ## Optional Dependencies
//!
//! - `Clock` - defaults to [`SystemClock`]
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `HttpClient` and the cache root are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .app_name("my-player")
//!     .cache_root("/path/to/cache")
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{Clock, HttpClient, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_APP_NAME: &str = "video-player-core";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(8_000);
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the video player core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Application name, used for the default user agent and cache root
    pub app_name: String,

    /// Effective `User-Agent` sent by the baseline HTTP data source
    pub user_agent: String,

    /// Parent directory of per-feature cache directories
    pub cache_root: PathBuf,

    pub http_client: Arc<dyn HttpClient>,

    pub clock: Arc<dyn Clock>,

    pub connect_timeout: Duration,

    pub read_timeout: Duration,

    /// Follow redirects that switch between `http` and `https`
    pub allow_cross_protocol_redirects: bool,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("app_name", &self.app_name)
            .field("user_agent", &self.user_agent)
            .field("cache_root", &self.cache_root)
            .field("http_client", &"HttpClient { ... }")
            .field("clock", &"Clock { ... }")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field(
                "allow_cross_protocol_redirects",
                &self.allow_cross_protocol_redirects,
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Publish playback, cache and source events on an [`EventBus`]
    pub enable_event_bus: bool,

    /// Default for `use_built_in_cache` on players that get no explicit cache config
    pub enable_builtin_cache: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_event_bus: true,
            enable_builtin_cache: false,
        }
    }
}

/// `User-Agent` used when the host does not supply one.
///
/// Shape: `<app>/<version> (<os>; <arch>) core-runtime/<version>`.
pub fn default_user_agent(app_name: &str) -> String {
    format!(
        "{}/{} ({}; {}) core-runtime/{}",
        app_name,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION")
    )
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - App name and user agent are not blank
    /// - Cache root is not empty
    /// - Timeouts are non-zero
    /// - Event buffer size is within bounds when the event bus is enabled
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::Config("App name cannot be empty".to_string()));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }

        if self.cache_root.as_os_str().is_empty() {
            return Err(Error::Config("Cache root cannot be empty".to_string()));
        }

        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(Error::Config(
                "Connect and read timeouts must be greater than 0".to_string(),
            ));
        }

        if self.features.enable_event_bus {
            if self.event_buffer_size == 0 {
                return Err(Error::Config(
                    "Event buffer size must be greater than 0 when the event bus is enabled"
                        .to_string(),
                ));
            }
            if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
                return Err(Error::Config(format!(
                    "Event buffer size exceeds maximum of {}",
                    MAX_EVENT_BUFFER_SIZE
                )));
            }
        }

        Ok(())
    }

    /// A fresh event bus sized from this config, or `None` when disabled.
    pub fn create_event_bus(&self) -> Option<EventBus> {
        self.features
            .enable_event_bus
            .then(|| EventBus::new(self.event_buffer_size))
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to stream network media. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack (URLSession/OkHttp)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeouts(connect_timeout, read_timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _connect_timeout: Duration,
    _read_timeout: Duration,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_cache_root(app_name: &str) -> Result<PathBuf> {
    Ok(bridge_desktop::default_cache_root(app_name))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_cache_root(_app_name: &str) -> Result<PathBuf> {
    Err(Error::Config(
        "Cache root is required. Use .cache_root() to set it, \
         or enable the 'desktop-shims' feature for a platform default."
            .to_string(),
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    app_name: Option<String>,
    user_agent: Option<String>,
    cache_root: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    allow_cross_protocol_redirects: Option<bool>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the application name (default `video-player-core`).
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Overrides the default user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the cache root directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().cache_root("/tmp/player-cache");
    /// ```
    pub fn cache_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_root = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// Required unless the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Allow redirects between `http` and `https` (default `true`).
    pub fn allow_cross_protocol_redirects(mut self, allow: bool) -> Self {
        self.allow_cross_protocol_redirects = Some(allow);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_event_bus(mut self, enabled: bool) -> Self {
        self.features.enable_event_bus = enabled;
        self
    }

    pub fn enable_builtin_cache(mut self, enabled: bool) -> Self {
        self.features.enable_builtin_cache = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - `HttpClient` is missing and no desktop default is available
    /// - the cache root is missing and no desktop default is available
    /// - configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let app_name = self
            .app_name
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let read_timeout = self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(connect_timeout, read_timeout)?,
        };

        let cache_root = match self.cache_root {
            Some(root) => root,
            None => provide_default_cache_root(&app_name)?,
        };

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| default_user_agent(&app_name));

        let config = CoreConfig {
            app_name,
            user_agent,
            cache_root,
            http_client,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            connect_timeout,
            read_timeout,
            allow_cross_protocol_redirects: self.allow_cross_protocol_redirects.unwrap_or(true),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
