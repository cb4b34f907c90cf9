//! Tests for the player adapter and its event relay, driven by a fake engine.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpStreamResponse};
use bridge_traits::time::ManualClock;
use core_playback::cache::{CacheConfig, CacheRegistry};
use core_playback::{
    ContentType, EngineError, EngineFactory, EngineListener, EngineState, MediaPlayer,
    MediaPlayerFactory, MediaSource, MediaSourceHelper, PlaybackAdapter, PlaybackEngine,
    PlaybackError, PlaybackParameters, PlayerEventListener, PlayerFactory, RepeatMode, Result,
    SourceHelperConfig, SurfaceHandle, VideoSize,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Fakes
// ============================================================================

struct OfflineClient;

#[async_trait]
impl HttpClient for OfflineClient {
    async fn open_stream(&self, _request: HttpRequest) -> BridgeResult<HttpStreamResponse> {
        Err(BridgeError::Connection("offline".into()))
    }
}

#[derive(Default)]
struct FakeEngine {
    calls: Mutex<Vec<String>>,
    listeners: Mutex<Vec<Arc<dyn EngineListener>>>,
    source: Mutex<Option<MediaSource>>,
    parameters: Mutex<Option<PlaybackParameters>>,
    volume: Mutex<Option<f32>>,
    repeat_mode: Mutex<Option<RepeatMode>>,
    surface: Mutex<Option<SurfaceHandle>>,
    state: Mutex<Option<EngineState>>,
    play_when_ready: AtomicBool,
    buffered: AtomicU8,
    released: AtomicBool,
}

impl FakeEngine {
    fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn emit_state(&self, state: EngineState) {
        *self.state.lock() = Some(state);
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_playback_state_changed(state);
        }
    }

    fn emit_error(&self, error: EngineError) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_player_error(&error);
        }
    }

    fn emit_video_size(&self, size: VideoSize) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_video_size_changed(size);
        }
    }
}

impl PlaybackEngine for FakeEngine {
    fn add_listener(&self, listener: Arc<dyn EngineListener>) {
        self.listeners.lock().push(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn EngineListener>) {
        self.listeners
            .lock()
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    fn set_media_source(&self, source: MediaSource) {
        self.record("set_media_source");
        *self.source.lock() = Some(source);
    }

    fn prepare(&self) {
        self.record("prepare");
    }

    fn set_play_when_ready(&self, play_when_ready: bool) {
        self.play_when_ready.store(play_when_ready, Ordering::SeqCst);
    }

    fn play_when_ready(&self) -> bool {
        self.play_when_ready.load(Ordering::SeqCst)
    }

    fn playback_state(&self) -> EngineState {
        self.state.lock().unwrap_or(EngineState::Idle)
    }

    fn stop(&self) {
        self.record("stop");
    }

    fn clear_media_items(&self) {
        self.record("clear_media_items");
    }

    fn set_video_surface(&self, surface: Option<SurfaceHandle>) {
        self.record("set_video_surface");
        *self.surface.lock() = surface;
    }

    fn seek_to(&self, position: Duration) {
        self.record(&format!("seek_to {}", position.as_millis()));
    }

    fn current_position(&self) -> Duration {
        Duration::from_millis(1_500)
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }

    fn buffered_percentage(&self) -> u8 {
        self.buffered.load(Ordering::SeqCst)
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = Some(volume);
    }

    fn set_repeat_mode(&self, mode: RepeatMode) {
        *self.repeat_mode.lock() = Some(mode);
    }

    fn set_playback_parameters(&self, parameters: PlaybackParameters) {
        self.record("set_playback_parameters");
        *self.parameters.lock() = Some(parameters);
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeEngineFactory {
    created: Mutex<Vec<Arc<FakeEngine>>>,
}

impl FakeEngineFactory {
    fn last(&self) -> Arc<FakeEngine> {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("an engine was created")
    }

    fn count(&self) -> usize {
        self.created.lock().len()
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create_engine(&self) -> Result<Arc<dyn PlaybackEngine>> {
        let engine = Arc::new(FakeEngine::default());
        self.created.lock().push(Arc::clone(&engine));
        Ok(engine)
    }
}

struct FailingEngineFactory;

impl EngineFactory for FailingEngineFactory {
    fn create_engine(&self) -> Result<Arc<dyn PlaybackEngine>> {
        Err(PlaybackError::Internal("no decoder available".to_string()))
    }
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl PlayerEventListener for RecordingListener {
    fn on_prepared(&self) {
        self.push("prepared".into());
    }

    fn on_rendering_start(&self) {
        self.push("rendering_start".into());
    }

    fn on_buffering_start(&self, buffered_percent: u8) {
        self.push(format!("buffering_start {}", buffered_percent));
    }

    fn on_buffering_end(&self, buffered_percent: u8) {
        self.push(format!("buffering_end {}", buffered_percent));
    }

    fn on_completion(&self) {
        self.push("completion".into());
    }

    fn on_error(&self, error: &EngineError) {
        self.push(format!("error {:?} {}", error.code, error.message));
    }

    fn on_video_size_changed(&self, width: u32, height: u32, rotation_degrees: Option<u32>) {
        self.push(format!("video_size {}x{} {:?}", width, height, rotation_degrees));
    }
}

struct Fixture {
    root: TempDir,
    helper: Arc<MediaSourceHelper>,
    engines: Arc<FakeEngineFactory>,
}

fn fixture() -> Fixture {
    let root = TempDir::new().unwrap();
    let helper = MediaSourceHelper::with_config(
        SourceHelperConfig::default(),
        root.path().to_path_buf(),
        Arc::new(OfflineClient),
        Arc::new(CacheRegistry::new(Arc::new(ManualClock::default()), None)),
        None,
    )
    .unwrap();
    Fixture {
        root,
        helper: Arc::new(helper),
        engines: Arc::new(FakeEngineFactory::default()),
    }
}

impl Fixture {
    fn factory(&self) -> MediaPlayerFactory {
        MediaPlayerFactory::new(Arc::clone(&self.helper), self.engines.clone())
    }

    fn player(&self) -> MediaPlayer {
        self.factory().create_player()
    }

    /// Initialized player with a source set and a recording listener attached.
    fn prepared_player(&self) -> (MediaPlayer, Arc<FakeEngine>, Arc<RecordingListener>) {
        let mut player = self.player();
        let listener = Arc::new(RecordingListener::default());
        player.set_event_listener(listener.clone());
        player.init_player().unwrap();
        player
            .set_data_source("https://cdn.example.com/movie.mp4", None)
            .unwrap();
        player.prepare_async().unwrap();
        (player, self.engines.last(), listener)
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_controls_before_init_are_noops() {
    let f = fixture();
    let mut player = f.player();

    player.start();
    player.pause();
    player.stop();
    player.reset();
    player.seek_to(Duration::from_secs(5));
    player.set_surface(Some(SurfaceHandle::new(7)));
    player.set_looping(true);
    player.set_volume(0.5, 0.5).unwrap();
    player.release();

    assert!(!player.is_playing());
    assert_eq!(player.current_position(), Duration::ZERO);
    assert_eq!(player.duration(), Duration::ZERO);
    assert_eq!(player.buffered_percentage(), 0);
    assert_eq!(player.speed(), 1.0);
    assert_eq!(player.tcp_speed(), 0);
    assert_eq!(f.engines.count(), 0);
}

#[test]
fn test_prepare_requires_engine_and_source() {
    let f = fixture();
    let mut player = f.player();

    assert!(matches!(
        player.prepare_async(),
        Err(PlaybackError::EngineNotInitialized)
    ));

    player.init_player().unwrap();
    assert!(matches!(player.prepare_async(), Err(PlaybackError::NoMediaSource)));
    assert!(f.engines.last().calls().is_empty());
}

#[test]
fn test_init_player_configures_engine() {
    let f = fixture();
    let mut player = f.player();
    player.init_player().unwrap();

    let engine = f.engines.last();
    assert!(player.is_initialized());
    assert!(engine.play_when_ready());
    assert_eq!(engine.listener_count(), 1);
}

#[test]
fn test_init_player_twice_releases_previous_engine() {
    let f = fixture();
    let mut player = f.player();
    player.init_player().unwrap();
    let first = f.engines.last();

    player.init_player().unwrap();
    assert_eq!(f.engines.count(), 2);
    assert!(first.released.load(Ordering::SeqCst));
    assert_eq!(first.listener_count(), 0);
}

#[test]
fn test_engine_factory_failure_propagates() {
    let f = fixture();
    let mut player = MediaPlayerFactory::new(Arc::clone(&f.helper), Arc::new(FailingEngineFactory))
        .create_player();

    assert!(matches!(player.init_player(), Err(PlaybackError::Internal(_))));
    assert!(!player.is_initialized());
}

#[test]
fn test_invalid_data_source_keeps_previous() {
    let f = fixture();
    let mut player = f.player();
    player
        .set_data_source("https://cdn.example.com/a.m3u8", None)
        .unwrap();

    assert!(player.set_data_source("   ", None).is_err());
    assert_eq!(
        player.media_source().map(|s| s.content_type()),
        Some(ContentType::Hls)
    );
}

#[test]
fn test_prepare_hands_source_to_engine() {
    let f = fixture();
    let mut player = f.player();
    player.init_player().unwrap();
    player.set_speed(1.5).unwrap();
    player
        .set_data_source("https://cdn.example.com/manifest.mpd", None)
        .unwrap();
    player.prepare_async().unwrap();

    let engine = f.engines.last();
    assert_eq!(
        engine.calls(),
        vec!["set_playback_parameters", "set_playback_parameters", "set_media_source", "prepare"]
    );
    assert_eq!(engine.parameters.lock().map(|p| p.speed), Some(1.5));
    assert_eq!(
        engine.source.lock().as_ref().map(|s| s.content_type()),
        Some(ContentType::Dash)
    );
    assert!(player.is_preparing());
}

#[test]
fn test_reset_and_release() {
    let f = fixture();
    let (mut player, engine, _listener) = f.prepared_player();
    player.set_surface(Some(SurfaceHandle::new(3)));

    player.reset();
    assert!(!player.is_preparing());
    assert!(engine
        .calls()
        .ends_with(&["stop".to_string(), "clear_media_items".to_string(), "set_video_surface".to_string()]));
    assert_eq!(*engine.surface.lock(), None);

    player.set_speed(2.0).unwrap();
    player.release();
    assert!(engine.released.load(Ordering::SeqCst));
    assert_eq!(engine.listener_count(), 0);
    assert!(!player.is_initialized());
    assert_eq!(player.speed(), 1.0);
    assert_eq!(player.duration(), Duration::ZERO);
}

#[test]
fn test_drop_releases_engine() {
    let f = fixture();
    let (player, engine, _listener) = f.prepared_player();
    drop(player);
    assert!(engine.released.load(Ordering::SeqCst));
}

// ============================================================================
// Controls
// ============================================================================

#[test]
fn test_play_pause_and_is_playing() {
    let f = fixture();
    let (mut player, engine, _listener) = f.prepared_player();

    assert!(!player.is_playing(), "idle engine is not playing");
    engine.emit_state(EngineState::Ready);
    assert!(player.is_playing());

    player.pause();
    assert!(!player.is_playing());
    player.start();
    engine.emit_state(EngineState::Buffering);
    assert!(player.is_playing());

    engine.emit_state(EngineState::Ended);
    assert!(!player.is_playing());
}

#[test]
fn test_queries_forward_to_engine() {
    let f = fixture();
    let (mut player, engine, _listener) = f.prepared_player();
    engine.buffered.store(65, Ordering::SeqCst);

    player.seek_to(Duration::from_millis(2_500));
    assert!(engine.calls().contains(&"seek_to 2500".to_string()));
    assert_eq!(player.current_position(), Duration::from_millis(1_500));
    assert_eq!(player.duration(), Duration::from_secs(60));
    assert_eq!(player.buffered_percentage(), 65);
}

#[test]
fn test_volume_is_averaged_and_validated() {
    let f = fixture();
    let (mut player, engine, _listener) = f.prepared_player();

    player.set_volume(0.25, 0.75).unwrap();
    assert_eq!(*engine.volume.lock(), Some(0.5));

    assert!(matches!(
        player.set_volume(1.5, 0.5),
        Err(PlaybackError::InvalidArgument(_))
    ));
    assert!(player.set_volume(-0.1, 0.5).is_err());
    assert!(player.set_volume(f32::NAN, 0.5).is_err());
    assert_eq!(*engine.volume.lock(), Some(0.5));
}

#[test]
fn test_looping_and_speed() {
    let f = fixture();
    let (mut player, engine, _listener) = f.prepared_player();

    player.set_looping(true);
    assert_eq!(*engine.repeat_mode.lock(), Some(RepeatMode::All));
    player.set_looping(false);
    assert_eq!(*engine.repeat_mode.lock(), Some(RepeatMode::Off));

    player.set_speed(0.75).unwrap();
    assert_eq!(player.speed(), 0.75);
    assert_eq!(engine.parameters.lock().map(|p| p.speed), Some(0.75));
    assert!(player.set_speed(0.0).is_err());
    assert!(player.set_speed(f32::INFINITY).is_err());
    assert_eq!(player.speed(), 0.75);
}

// ============================================================================
// Event relay
// ============================================================================

#[test]
fn test_first_ready_reports_prepared() {
    let f = fixture();
    let (player, engine, listener) = f.prepared_player();
    engine.buffered.store(40, Ordering::SeqCst);

    // Only Ready ends preparation
    engine.emit_state(EngineState::Buffering);
    assert!(listener.events().is_empty());
    assert!(player.is_preparing());

    engine.emit_state(EngineState::Ready);
    assert_eq!(listener.events(), vec!["prepared", "rendering_start"]);
    assert!(!player.is_preparing());

    engine.emit_state(EngineState::Buffering);
    engine.emit_state(EngineState::Ready);
    engine.emit_state(EngineState::Idle);
    engine.emit_state(EngineState::Ended);
    assert_eq!(
        listener.events(),
        vec![
            "prepared",
            "rendering_start",
            "buffering_start 40",
            "buffering_end 40",
            "completion"
        ]
    );
}

#[test]
fn test_errors_and_video_size_are_relayed() {
    let f = fixture();
    let (_player, engine, listener) = f.prepared_player();

    engine.emit_error(EngineError::new(Some(2001), "source unreachable"));
    engine.emit_video_size(VideoSize::new(1280, 720));
    engine.emit_video_size(VideoSize::new(720, 1280).with_rotation(90));

    assert_eq!(
        listener.events(),
        vec![
            "error Some(2001) source unreachable",
            "video_size 1280x720 None",
            "video_size 720x1280 Some(90)"
        ]
    );
}

#[test]
fn test_listener_can_be_replaced() {
    let f = fixture();
    let (mut player, engine, first) = f.prepared_player();
    let second = Arc::new(RecordingListener::default());
    player.set_event_listener(second.clone());

    engine.emit_state(EngineState::Ready);
    assert!(first.events().is_empty());
    assert_eq!(second.events(), vec!["prepared", "rendering_start"]);
}

#[test]
fn test_events_published_on_bus() {
    let f = fixture();
    let bus = EventBus::new(32);
    let mut events = bus.subscribe();
    let mut player = f.factory().with_event_bus(bus).create_player();
    player.init_player().unwrap();
    player
        .set_data_source("https://cdn.example.com/movie.mp4", None)
        .unwrap();
    player.prepare_async().unwrap();

    let engine = f.engines.last();
    engine.emit_state(EngineState::Ready);
    engine.emit_state(EngineState::Ended);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Playback(event) = event {
            received.push(event);
        }
    }
    assert_eq!(
        received,
        vec![
            PlaybackEvent::Prepared,
            PlaybackEvent::RenderingStart,
            PlaybackEvent::Completed
        ]
    );
}

// ============================================================================
// Factory
// ============================================================================

#[test]
fn test_factory_cache_config_reaches_player() {
    let f = fixture();
    let cache_dir = f.root.path().join("player-cache");
    let config = CacheConfig::builder()
        .use_built_in_cache(true)
        .cache_dir(&cache_dir)
        .cache_max_bytes(4 * 1024 * 1024)
        .build()
        .unwrap();
    let factory = f.factory().with_cache_config(config);

    let mut first = factory.create_player();
    let mut second = factory.create_player();
    assert!(first.cache_config().use_built_in_cache());

    first
        .set_data_source("https://cdn.example.com/a.mp4", None)
        .unwrap();
    second
        .set_data_source("https://cdn.example.com/b.mp4", None)
        .unwrap();

    // Both players share one cache instance through the helper's registry
    assert_eq!(f.helper.registry().len(), 1);
    assert!(f.helper.registry().contains(&cache_dir, 4 * 1024 * 1024));
}

#[test]
fn test_default_factory_does_not_cache() {
    let f = fixture();
    let mut player = f.player();
    assert!(!player.cache_config().use_built_in_cache());

    player
        .set_data_source("https://cdn.example.com/a.mp4", None)
        .unwrap();
    assert!(f.helper.registry().is_empty());
}
