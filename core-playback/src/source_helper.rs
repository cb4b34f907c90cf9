//! # Media Source Helper
//!
//! Turns a URI plus optional headers and cache settings into a
//! [`MediaSource`] the engine can play.
//!
//! ## Resolution
//!
//! 1. Validate the URI; nothing is built for an invalid one.
//! 2. RTMP/RTSP return a native source straight away; headers and cache are
//!    not consulted.
//! 3. Clone the baseline HTTP factory, apply headers to the clone, route it
//!    through a [`DefaultDataSourceFactory`] and, when caching, wrap that in a
//!    [`CacheDataSourceFactory`] bound to the registry's cache.
//! 4. Pick the demux factory by classification and create the source.

use crate::cache::config::CacheConfig;
use crate::cache::registry::CacheRegistry;
use crate::classifier::classify;
use crate::config::SourceHelperConfig;
use crate::datasource::cache::{CacheDataSourceFactory, CacheFlags};
use crate::datasource::default::DefaultDataSourceFactory;
use crate::datasource::http::HttpDataSourceFactory;
use crate::datasource::DataSourceFactory;
use crate::error::Result;
use crate::headers::HeaderInjector;
use crate::media_item::MediaItem;
use crate::media_source::{MediaSource, MediaSourceFactory, Protocol};
use bridge_traits::http::HttpClient;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, SourceEvent};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument};

/// Builds data source chains and media sources.
///
/// Holds the cache registry, so every helper (and every player created from
/// it) sharing one registry shares its cache instances.
pub struct MediaSourceHelper {
    config: SourceHelperConfig,
    cache_root: PathBuf,
    http_client: Arc<dyn HttpClient>,
    registry: Arc<CacheRegistry>,
    base_http: OnceLock<HttpDataSourceFactory>,
    event_bus: Option<EventBus>,
}

impl MediaSourceHelper {
    /// Helper with its own cache registry.
    pub fn new(core: &CoreConfig, event_bus: Option<EventBus>) -> Result<Self> {
        let registry = Arc::new(CacheRegistry::new(
            Arc::clone(&core.clock),
            event_bus.clone(),
        ));
        Self::with_registry(core, registry, event_bus)
    }

    /// Helper that shares an existing cache registry.
    pub fn with_registry(
        core: &CoreConfig,
        registry: Arc<CacheRegistry>,
        event_bus: Option<EventBus>,
    ) -> Result<Self> {
        Self::with_config(
            SourceHelperConfig::from_core(core),
            core.cache_root.clone(),
            Arc::clone(&core.http_client),
            registry,
            event_bus,
        )
    }

    pub fn with_config(
        config: SourceHelperConfig,
        cache_root: PathBuf,
        http_client: Arc<dyn HttpClient>,
        registry: Arc<CacheRegistry>,
        event_bus: Option<EventBus>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache_root,
            http_client,
            registry,
            base_http: OnceLock::new(),
            event_bus,
        })
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SourceHelperConfig {
        &self.config
    }

    /// Cache directory used when a cache config names none.
    pub fn default_cache_dir(&self) -> PathBuf {
        self.cache_root.join(&self.config.cache_dir_name)
    }

    /// Cache config for players created without one.
    pub fn default_cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .use_built_in_cache(self.config.builtin_cache_by_default)
            .build()
            .unwrap_or_default()
    }

    /// Copy of the baseline HTTP factory (user agent preset, cross-protocol
    /// redirects per config). The baseline itself is built on first use and
    /// never handed out.
    pub fn base_http_factory(&self) -> HttpDataSourceFactory {
        self.base_http
            .get_or_init(|| {
                let mut factory = HttpDataSourceFactory::new(Arc::clone(&self.http_client));
                if !self.config.user_agent.is_empty() {
                    factory.set_user_agent(self.config.user_agent.clone());
                }
                factory
                    .set_allow_cross_protocol_redirects(self.config.allow_cross_protocol_redirects)
                    .set_connect_timeout(self.config.connect_timeout)
                    .set_read_timeout(self.config.read_timeout);
                debug!("Built baseline HTTP data source factory");
                factory
            })
            .clone()
    }

    /// The data source chain alone.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`/`Cache` when `use_cache` is set and the cache cannot
    /// be opened.
    pub fn build_data_source_factory(
        &self,
        headers: Option<&HashMap<String, String>>,
        use_cache: bool,
        cache_config: Option<&CacheConfig>,
    ) -> Result<Arc<dyn DataSourceFactory>> {
        let mut http = self.base_http_factory();
        HeaderInjector::apply(headers, &mut http);

        let upstream: Arc<dyn DataSourceFactory> = Arc::new(DefaultDataSourceFactory::new(http));
        if !use_cache {
            return Ok(upstream);
        }

        let cache = self
            .registry
            .resolve(cache_config, &self.default_cache_dir())?;
        let mut factory = CacheDataSourceFactory::new(cache, upstream)
            .with_flags(CacheFlags::ignore_cache_on_error());
        if let Some(resolver) = cache_config.and_then(|c| c.cache_key_resolver()) {
            factory = factory.with_key_resolver(Arc::clone(resolver));
        }
        if let Some(bus) = &self.event_bus {
            factory = factory.with_event_bus(bus.clone());
        }
        Ok(Arc::new(factory))
    }

    /// Resolve `uri` into a playable source.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for empty or unparseable URIs; cache errors as for
    /// [`build_data_source_factory`](Self::build_data_source_factory).
    #[instrument(skip(self, headers, cache_config), fields(uri = %uri))]
    pub fn get_media_source(
        &self,
        uri: &str,
        headers: Option<&HashMap<String, String>>,
        use_cache: bool,
        cache_config: Option<&CacheConfig>,
    ) -> Result<MediaSource> {
        let item = MediaItem::parse(uri)?;
        let content_type = classify(item.uri());
        debug!(%content_type, use_cache, "Classified media URI");

        if let Some(protocol) = Protocol::from_content_type(content_type) {
            let source = MediaSource::native(item, protocol);
            self.emit_resolved(&source, false);
            return Ok(source);
        }

        let chain = self.build_data_source_factory(headers, use_cache, cache_config)?;
        let source = MediaSourceFactory::for_content_type(content_type, chain)?.create_media_source(item);
        self.emit_resolved(&source, use_cache);
        Ok(source)
    }

    fn emit_resolved(&self, source: &MediaSource, cached: bool) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Source(SourceEvent::Resolved {
                uri: source.uri().to_string(),
                content_type: source.content_type().to_string(),
                cached,
            }));
        }
    }
}

impl fmt::Debug for MediaSourceHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSourceHelper")
            .field("config", &self.config)
            .field("cache_root", &self.cache_root)
            .field("registry", &self.registry)
            .finish()
    }
}
