//! # Source Helper Configuration
//!
//! Settings for [`MediaSourceHelper`](crate::source_helper::MediaSourceHelper)
//! derived from the runtime [`CoreConfig`].

use crate::error::{PlaybackError, Result};
use core_runtime::config::CoreConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source helper configuration.
///
/// Controls the baseline HTTP data source and where the default cache lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHelperConfig {
    /// Name of the default cache directory under the runtime cache root.
    ///
    /// Default: `video-cache`.
    #[serde(default = "default_cache_dir_name")]
    pub cache_dir_name: String,

    /// `User-Agent` preset on the baseline HTTP factory.
    ///
    /// Default: empty, which leaves the header to the HTTP client.
    #[serde(default)]
    pub user_agent: String,

    /// Whether redirects may switch between `http` and `https`.
    ///
    /// Default: true.
    #[serde(default = "default_allow_cross_protocol_redirects")]
    pub allow_cross_protocol_redirects: bool,

    /// Maximum duration to wait for a connection.
    ///
    /// Default: 8 seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Maximum duration to wait between body chunks.
    ///
    /// Default: 8 seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,

    /// `use_built_in_cache` for players without an explicit cache config.
    ///
    /// Default: false.
    #[serde(default)]
    pub builtin_cache_by_default: bool,
}

impl Default for SourceHelperConfig {
    fn default() -> Self {
        Self {
            cache_dir_name: default_cache_dir_name(),
            user_agent: String::new(),
            allow_cross_protocol_redirects: default_allow_cross_protocol_redirects(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            builtin_cache_by_default: false,
        }
    }
}

impl SourceHelperConfig {
    /// Take the HTTP and cache defaults from the runtime configuration.
    pub fn from_core(core: &CoreConfig) -> Self {
        Self {
            cache_dir_name: default_cache_dir_name(),
            user_agent: core.user_agent.clone(),
            allow_cross_protocol_redirects: core.allow_cross_protocol_redirects,
            connect_timeout: core.connect_timeout,
            read_timeout: core.read_timeout,
            builtin_cache_by_default: core.features.enable_builtin_cache,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let name = self.cache_dir_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(PlaybackError::InvalidArgument(format!(
                "cache_dir_name must be a single directory name, got '{}'",
                self.cache_dir_name
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(PlaybackError::InvalidArgument(
                "connect_timeout must be > 0".to_string(),
            ));
        }

        if self.read_timeout.is_zero() {
            return Err(PlaybackError::InvalidArgument(
                "read_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_cache_dir_name() -> String {
    "video-cache".to_string()
}

fn default_allow_cross_protocol_redirects() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_millis(8_000)
}

fn default_read_timeout() -> Duration {
    Duration::from_millis(8_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SourceHelperConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_dir_name, "video-cache");
        assert!(config.allow_cross_protocol_redirects);
    }

    #[test]
    fn test_invalid_dir_name() {
        let mut config = SourceHelperConfig::default();
        config.cache_dir_name = "a/b".to_string();
        assert!(config.validate().is_err());

        config.cache_dir_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeouts() {
        let mut config = SourceHelperConfig::default();
        config.read_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: SourceHelperConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.cache_dir_name, "video-cache");
        assert_eq!(config.connect_timeout, Duration::from_secs(8));
        assert!(!config.builtin_cache_by_default);
    }
}
