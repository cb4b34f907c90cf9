use crate::cache::config::CacheConfig;
use crate::player::MediaPlayer;
use crate::source_helper::MediaSourceHelper;
use crate::traits::{EngineFactory, PlaybackAdapter};
use core_runtime::events::EventBus;
use std::fmt;
use std::sync::Arc;

/// Creates players of one kind.
pub trait PlayerFactory: Send + Sync {
    type Player: PlaybackAdapter;

    fn create_player(&self) -> Self::Player;
}

/// Factory for [`MediaPlayer`]s sharing one source helper (and so one cache
/// registry) and one engine factory.
#[derive(Clone)]
pub struct MediaPlayerFactory {
    helper: Arc<MediaSourceHelper>,
    engine_factory: Arc<dyn EngineFactory>,
    cache_config: Option<CacheConfig>,
    event_bus: Option<EventBus>,
}

impl MediaPlayerFactory {
    pub fn new(helper: Arc<MediaSourceHelper>, engine_factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            helper,
            engine_factory,
            cache_config: None,
            event_bus: None,
        }
    }

    /// Cache config for every player; without one the helper's default applies.
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = Some(config);
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn helper(&self) -> &Arc<MediaSourceHelper> {
        &self.helper
    }
}

impl PlayerFactory for MediaPlayerFactory {
    type Player = MediaPlayer;

    fn create_player(&self) -> MediaPlayer {
        let cache_config = self
            .cache_config
            .clone()
            .unwrap_or_else(|| self.helper.default_cache_config());
        MediaPlayer::new(
            Arc::clone(&self.helper),
            Arc::clone(&self.engine_factory),
            cache_config,
            self.event_bus.clone(),
        )
    }
}

impl fmt::Debug for MediaPlayerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPlayerFactory")
            .field("helper", &self.helper)
            .field("cache_config", &self.cache_config)
            .field("event_bus", &self.event_bus.is_some())
            .finish()
    }
}
