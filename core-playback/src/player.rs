//! # Media Player
//!
//! [`PlaybackAdapter`] over an external [`PlaybackEngine`], with media
//! sources resolved by [`MediaSourceHelper`].
//!
//! Engine callbacks are translated by an internal relay:
//!
//! | Engine                      | While preparing                   | Otherwise                 |
//! |-----------------------------|-----------------------------------|---------------------------|
//! | state `Ready`               | `on_prepared`, `on_rendering_start` | `on_buffering_end(pct)` |
//! | state `Buffering`           | ignored                           | `on_buffering_start(pct)` |
//! | state `Ended`               | ignored                           | `on_completion`           |
//! | error                       | `on_error`                        | `on_error`                |
//! | video size                  | `on_video_size_changed`           | `on_video_size_changed`   |

use crate::cache::config::CacheConfig;
use crate::error::{PlaybackError, Result};
use crate::media_source::MediaSource;
use crate::source_helper::MediaSourceHelper;
use crate::traits::{
    EngineError, EngineFactory, EngineListener, EngineState, PlaybackAdapter, PlaybackEngine,
    PlaybackParameters, PlayerEventListener, RepeatMode, SurfaceHandle, VideoSize,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Player adapter backed by a [`PlaybackEngine`].
pub struct MediaPlayer {
    helper: Arc<MediaSourceHelper>,
    engine_factory: Arc<dyn EngineFactory>,
    cache_config: CacheConfig,
    engine: Option<Arc<dyn PlaybackEngine>>,
    media_source: Option<MediaSource>,
    speed: Option<PlaybackParameters>,
    relay: Arc<EventRelay>,
}

impl MediaPlayer {
    pub fn new(
        helper: Arc<MediaSourceHelper>,
        engine_factory: Arc<dyn EngineFactory>,
        cache_config: CacheConfig,
        event_bus: Option<EventBus>,
    ) -> Self {
        Self {
            helper,
            engine_factory,
            cache_config,
            engine: None,
            media_source: None,
            speed: None,
            relay: Arc::new(EventRelay::new(event_bus)),
        }
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    /// Source set by the last successful `set_data_source`.
    pub fn media_source(&self) -> Option<&MediaSource> {
        self.media_source.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Whether the next `Ready` will be reported as `on_prepared`.
    pub fn is_preparing(&self) -> bool {
        self.relay.is_preparing.load(Ordering::SeqCst)
    }

    fn relay_listener(&self) -> Arc<dyn EngineListener> {
        self.relay.clone()
    }
}

impl PlaybackAdapter for MediaPlayer {
    fn init_player(&mut self) -> Result<()> {
        if self.engine.is_some() {
            debug!("Re-initializing player, releasing previous engine");
            self.release();
        }

        let engine = self.engine_factory.create_engine()?;
        self.relay.attach(&engine);
        engine.add_listener(self.relay_listener());
        engine.set_play_when_ready(true);
        self.engine = Some(engine);

        info!("Player initialized");
        Ok(())
    }

    #[instrument(skip(self, path, headers), fields(uri = %path))]
    fn set_data_source(
        &mut self,
        path: &str,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        let source = self.helper.get_media_source(
            path,
            headers,
            self.cache_config.use_built_in_cache(),
            Some(&self.cache_config),
        )?;
        self.media_source = Some(source);
        Ok(())
    }

    fn set_event_listener(&mut self, listener: Arc<dyn PlayerEventListener>) {
        *self.relay.listener.write() = Some(listener);
    }

    fn start(&mut self) {
        if let Some(engine) = &self.engine {
            engine.set_play_when_ready(true);
        }
    }

    fn pause(&mut self) {
        if let Some(engine) = &self.engine {
            engine.set_play_when_ready(false);
        }
    }

    fn stop(&mut self) {
        if let Some(engine) = &self.engine {
            engine.stop();
        }
    }

    fn prepare_async(&mut self) -> Result<()> {
        let engine = self.engine.as_ref().ok_or(PlaybackError::EngineNotInitialized)?;
        let source = self.media_source.as_ref().ok_or(PlaybackError::NoMediaSource)?;

        if let Some(parameters) = self.speed {
            engine.set_playback_parameters(parameters);
        }
        self.relay.is_preparing.store(true, Ordering::SeqCst);
        engine.set_media_source(source.clone());
        engine.prepare();

        debug!(content_type = %source.content_type(), "Preparing");
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(engine) = &self.engine {
            engine.stop();
            engine.clear_media_items();
            engine.set_video_surface(None);
        }
        self.relay.is_preparing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        match &self.engine {
            Some(engine) => match engine.playback_state() {
                EngineState::Buffering | EngineState::Ready => engine.play_when_ready(),
                EngineState::Idle | EngineState::Ended => false,
            },
            None => false,
        }
    }

    fn seek_to(&mut self, position: Duration) {
        if let Some(engine) = &self.engine {
            engine.seek_to(position);
        }
    }

    fn release(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.remove_listener(&self.relay_listener());
            engine.release();
            self.relay.detach();
            info!("Player released");
        }
        self.relay.is_preparing.store(false, Ordering::SeqCst);
        self.speed = None;
    }

    fn current_position(&self) -> Duration {
        self.engine
            .as_ref()
            .map_or(Duration::ZERO, |engine| engine.current_position())
    }

    fn duration(&self) -> Duration {
        self.engine
            .as_ref()
            .and_then(|engine| engine.duration())
            .unwrap_or(Duration::ZERO)
    }

    fn buffered_percentage(&self) -> u8 {
        self.engine
            .as_ref()
            .map_or(0, |engine| engine.buffered_percentage())
    }

    fn set_surface(&mut self, surface: Option<SurfaceHandle>) {
        if let Some(engine) = &self.engine {
            engine.set_video_surface(surface);
        }
    }

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        for volume in [left, right] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(PlaybackError::InvalidArgument(format!(
                    "volume must be within 0.0..=1.0, got {}",
                    volume
                )));
            }
        }

        if let Some(engine) = &self.engine {
            engine.set_volume((left + right) / 2.0);
        }
        Ok(())
    }

    fn set_looping(&mut self, looping: bool) {
        if let Some(engine) = &self.engine {
            engine.set_repeat_mode(if looping {
                RepeatMode::All
            } else {
                RepeatMode::Off
            });
        }
    }

    fn set_speed(&mut self, speed: f32) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "speed must be a positive number, got {}",
                speed
            )));
        }

        let parameters = PlaybackParameters::new(speed);
        self.speed = Some(parameters);
        if let Some(engine) = &self.engine {
            engine.set_playback_parameters(parameters);
        }
        Ok(())
    }

    fn speed(&self) -> f32 {
        self.speed.map_or(1.0, |parameters| parameters.speed)
    }

    fn tcp_speed(&self) -> u64 {
        0
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        if self.engine.is_some() {
            self.release();
        }
    }
}

impl fmt::Debug for MediaPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPlayer")
            .field("initialized", &self.engine.is_some())
            .field("media_source", &self.media_source.as_ref().map(|s| s.uri()))
            .field("cache_config", &self.cache_config)
            .field("speed", &self.speed())
            .finish()
    }
}

/// Translates engine callbacks into application callbacks and bus events.
struct EventRelay {
    engine: RwLock<Option<Weak<dyn PlaybackEngine>>>,
    listener: RwLock<Option<Arc<dyn PlayerEventListener>>>,
    is_preparing: AtomicBool,
    event_bus: Option<EventBus>,
}

impl EventRelay {
    fn new(event_bus: Option<EventBus>) -> Self {
        Self {
            engine: RwLock::new(None),
            listener: RwLock::new(None),
            is_preparing: AtomicBool::new(false),
            event_bus,
        }
    }

    fn attach(&self, engine: &Arc<dyn PlaybackEngine>) {
        *self.engine.write() = Some(Arc::downgrade(engine));
    }

    fn detach(&self) {
        *self.engine.write() = None;
    }

    fn buffered_percentage(&self) -> u8 {
        self.engine
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .map_or(0, |engine| engine.buffered_percentage())
    }

    fn notify(&self, f: impl FnOnce(&dyn PlayerEventListener)) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            f(listener.as_ref());
        }
    }

    fn publish(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

impl EngineListener for EventRelay {
    fn on_playback_state_changed(&self, state: EngineState) {
        debug!(?state, "Engine state changed");

        if self.is_preparing.load(Ordering::SeqCst) {
            if state == EngineState::Ready {
                self.notify(|l| l.on_prepared());
                self.publish(PlaybackEvent::Prepared);
                self.notify(|l| l.on_rendering_start());
                self.publish(PlaybackEvent::RenderingStart);
                self.is_preparing.store(false, Ordering::SeqCst);
            }
            return;
        }

        match state {
            EngineState::Buffering => {
                let percent = self.buffered_percentage();
                self.notify(|l| l.on_buffering_start(percent));
                self.publish(PlaybackEvent::BufferingStart { percent });
            }
            EngineState::Ready => {
                let percent = self.buffered_percentage();
                self.notify(|l| l.on_buffering_end(percent));
                self.publish(PlaybackEvent::BufferingEnd { percent });
            }
            EngineState::Ended => {
                self.notify(|l| l.on_completion());
                self.publish(PlaybackEvent::Completed);
            }
            EngineState::Idle => {}
        }
    }

    fn on_player_error(&self, error: &EngineError) {
        warn!(code = ?error.code, "Playback error: {}", error.message);
        self.notify(|l| l.on_error(error));
        self.publish(PlaybackEvent::Error {
            code: error.code,
            message: error.message.clone(),
            recoverable: false,
        });
    }

    fn on_video_size_changed(&self, size: VideoSize) {
        let rotation = Some(size.unapplied_rotation_degrees).filter(|degrees| *degrees > 0);
        self.notify(|l| l.on_video_size_changed(size.width, size.height, rotation));
        self.publish(PlaybackEvent::VideoSizeChanged {
            width: size.width,
            height: size.height,
            rotation_degrees: rotation,
        });
    }
}
