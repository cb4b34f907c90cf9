//! Per-player cache configuration

use crate::cache::key::CacheKeyResolver;
use crate::error::{PlaybackError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default cache capacity: 512 MiB.
pub const DEFAULT_CACHE_MAX_BYTES: u64 = 512 * 1024 * 1024;

/// Immutable cache settings handed to a player or to a single resolution.
///
/// Construct with [`CacheConfig::builder`]; `build()` enforces
/// `cache_max_bytes > 0`.
#[derive(Clone)]
pub struct CacheConfig {
    use_built_in_cache: bool,
    cache_dir: Option<PathBuf>,
    cache_max_bytes: u64,
    cache_key_resolver: Option<Arc<dyn CacheKeyResolver>>,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Whether players built with this config route media through the disk cache.
    pub fn use_built_in_cache(&self) -> bool {
        self.use_built_in_cache
    }

    /// Cache directory; `None` means the helper's default directory.
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn cache_max_bytes(&self) -> u64 {
        self.cache_max_bytes
    }

    pub fn cache_key_resolver(&self) -> Option<&Arc<dyn CacheKeyResolver>> {
        self.cache_key_resolver.as_ref()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            use_built_in_cache: false,
            cache_dir: None,
            cache_max_bytes: DEFAULT_CACHE_MAX_BYTES,
            cache_key_resolver: None,
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("use_built_in_cache", &self.use_built_in_cache)
            .field("cache_dir", &self.cache_dir)
            .field("cache_max_bytes", &self.cache_max_bytes)
            .field(
                "cache_key_resolver",
                &self
                    .cache_key_resolver
                    .as_ref()
                    .map(|_| "CacheKeyResolver { ... }"),
            )
            .finish()
    }
}

/// Builder for [`CacheConfig`].
#[derive(Default)]
pub struct CacheConfigBuilder {
    use_built_in_cache: bool,
    cache_dir: Option<PathBuf>,
    cache_max_bytes: Option<u64>,
    cache_key_resolver: Option<Arc<dyn CacheKeyResolver>>,
}

impl CacheConfigBuilder {
    pub fn use_built_in_cache(mut self, use_cache: bool) -> Self {
        self.use_built_in_cache = use_cache;
        self
    }

    pub fn cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn cache_max_bytes(mut self, bytes: u64) -> Self {
        self.cache_max_bytes = Some(bytes);
        self
    }

    pub fn cache_key_resolver(mut self, resolver: Arc<dyn CacheKeyResolver>) -> Self {
        self.cache_key_resolver = Some(resolver);
        self
    }

    /// # Errors
    ///
    /// `InvalidArgument` if the capacity is 0 or the directory is an empty path.
    pub fn build(self) -> Result<CacheConfig> {
        let cache_max_bytes = self.cache_max_bytes.unwrap_or(DEFAULT_CACHE_MAX_BYTES);
        if cache_max_bytes == 0 {
            return Err(PlaybackError::InvalidArgument(
                "cache_max_bytes must be greater than 0".to_string(),
            ));
        }

        if let Some(dir) = &self.cache_dir {
            if dir.as_os_str().is_empty() {
                return Err(PlaybackError::InvalidArgument(
                    "cache_dir cannot be an empty path".to_string(),
                ));
            }
        }

        Ok(CacheConfig {
            use_built_in_cache: self.use_built_in_cache,
            cache_dir: self.cache_dir,
            cache_max_bytes,
            cache_key_resolver: self.cache_key_resolver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::StripQueryKeyResolver;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert!(!config.use_built_in_cache());
        assert!(config.cache_dir().is_none());
        assert_eq!(config.cache_max_bytes(), 536_870_912);
        assert!(config.cache_key_resolver().is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::builder()
            .use_built_in_cache(true)
            .cache_dir("/tmp/videos")
            .cache_max_bytes(64 * 1024 * 1024)
            .cache_key_resolver(Arc::new(StripQueryKeyResolver))
            .build()
            .unwrap();

        assert!(config.use_built_in_cache());
        assert_eq!(config.cache_dir(), Some(Path::new("/tmp/videos")));
        assert_eq!(config.cache_max_bytes(), 64 * 1024 * 1024);
        assert_eq!(
            config
                .cache_key_resolver()
                .unwrap()
                .resolve_key("https://a/v.mp4?t=1"),
            "https://a/v.mp4"
        );
    }

    #[test]
    fn test_builder_rejects_zero_capacity() {
        let result = CacheConfig::builder().cache_max_bytes(0).build();
        assert!(matches!(result, Err(PlaybackError::InvalidArgument(_))));
    }

    #[test]
    fn test_builder_rejects_empty_dir() {
        let result = CacheConfig::builder().cache_dir("").build();
        assert!(matches!(result, Err(PlaybackError::InvalidArgument(_))));
    }

    #[test]
    fn test_debug_hides_resolver() {
        let config = CacheConfig::builder()
            .cache_key_resolver(Arc::new(StripQueryKeyResolver))
            .build()
            .unwrap();
        assert!(format!("{:?}", config).contains("CacheKeyResolver { ... }"));
    }
}
