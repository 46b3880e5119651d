//! Player - Playback state facade over an engine
//!
//! Coordinates:
//! - Optimistic transport commands (play, pause, stop, seek)
//! - Source replacement and engine sessions
//! - Id-based loading through the lookup gateway
//! - Folding engine events into the published state

use crate::{
    engine::{EngineEvent, EngineEventKind, EngineEvents, LifecycleKind, PlayerEngine},
    gateway::{Catalog, LookupGateway, PlaybackApiGateway},
    model::{Playlist, Video},
    time, Error, Phase, PlayerConfig, Result, SessionId,
};
use serde::{Serialize, Serializer};
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Snapshot of the observable playback state
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub phase: Phase,
    pub current_video: Option<Video>,
    /// Playhead position in seconds
    pub current_time: f64,
    /// Content duration in seconds, 0 while unknown
    pub duration: f64,
    /// Always `time::progress(current_time, duration)`
    pub progress: f64,
    pub volume: f32,
    pub muted: bool,
    /// True while an id-based load is outstanding; `set_videos` clears it
    pub is_loading: bool,
    #[serde(serialize_with = "error_message")]
    pub last_error: Option<Error>,
    /// Engine session of the active source list
    pub session: Option<SessionId>,
}

fn error_message<S: Serializer>(error: &Option<Error>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            current_video: None,
            current_time: 0.0,
            duration: 0.0,
            progress: 0.0,
            volume: 1.0,
            muted: false,
            is_loading: false,
            last_error: None,
            session: None,
        }
    }
}

impl PlaybackState {
    fn set_phase(&mut self, phase: Phase) -> bool {
        if self.phase == phase {
            return false;
        }
        info!(from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
        true
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.current_time = seconds;
        self.progress = time::progress(self.current_time, self.duration);
    }

    fn set_duration(&mut self, seconds: f64) {
        self.duration = seconds;
        self.progress = time::progress(self.current_time, self.duration);
    }

    /// Reset position data for a freshly replaced source list
    fn start_session(&mut self, session: SessionId, video: Option<Video>) {
        debug!(%session, "Session started");
        self.session = Some(session);
        self.current_video = video;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.progress = 0.0;
        self.set_phase(Phase::Loading);
    }

    /// Fold one engine event; returns whether anything changed
    fn apply(&mut self, event: EngineEvent) -> bool {
        if self.session.is_some_and(|current| current != event.session) {
            warn!(event_session = %event.session, "Dropping event from a stale session");
            return false;
        }

        debug!(kind = ?event.kind, "Engine event");
        match event.kind {
            EngineEventKind::Progress { seconds } => {
                self.set_current_time(seconds);
                true
            }
            EngineEventKind::DurationChanged { seconds } => {
                self.set_duration(seconds);
                true
            }
            EngineEventKind::Lifecycle { kind, detail } => match kind {
                LifecycleKind::Play => self.set_phase(Phase::Playing),
                LifecycleKind::Pause => self.set_phase(Phase::Paused),
                LifecycleKind::End => self.set_phase(Phase::Ended),
                LifecycleKind::Fail => {
                    let detail = detail.unwrap_or_else(|| "unknown error".to_string());
                    warn!(%detail, "Engine reported a playback failure");
                    self.last_error = Some(Error::PlaybackFailed(detail));
                    self.set_phase(Phase::Error);
                    true
                }
            },
        }
    }
}

/// Playback state facade
///
/// Owns the [`PlaybackState`] and is its only writer. Commands update the
/// state optimistically and are forwarded to the engine; engine events are
/// folded in by a background task that lives as long as the player. Must be
/// constructed inside a tokio runtime.
pub struct Player {
    engine: Arc<dyn PlayerEngine>,
    catalog: Option<Catalog>,
    state: Arc<watch::Sender<PlaybackState>>,
    in_flight: AtomicUsize,
    pump: JoinHandle<()>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player").finish_non_exhaustive()
    }
}

impl Player {
    /// Create a player, using the HTTP playback API when credentials are present
    pub fn new(config: PlayerConfig, engine: Arc<dyn PlayerEngine>) -> Result<Self> {
        let gateway: Option<Arc<dyn LookupGateway>> = match (&config.account_id, &config.policy_key) {
            (Some(account), Some(policy)) if config.has_credentials() => {
                let gateway = PlaybackApiGateway::new(account.clone(), policy.clone(), &config.service)
                    .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {}", e)))?;
                Some(Arc::new(gateway))
            }
            _ => None,
        };

        Self::with_gateway(config, engine, gateway)
    }

    /// Create a player with an explicit gateway (or none)
    pub fn with_gateway(
        config: PlayerConfig,
        engine: Arc<dyn PlayerEngine>,
        gateway: Option<Arc<dyn LookupGateway>>,
    ) -> Result<Self> {
        config.validate()?;

        let catalog = gateway.map(|gateway| Catalog::new(gateway, config.auth_token.clone()));
        Ok(Self::build(engine, catalog, config.initial_volume))
    }

    /// Create a player that can only load sources by URL
    pub fn url_only(engine: Arc<dyn PlayerEngine>) -> Self {
        Self::build(engine, None, PlaybackState::default().volume)
    }

    fn build(engine: Arc<dyn PlayerEngine>, catalog: Option<Catalog>, volume: f32) -> Self {
        let initial = PlaybackState {
            volume,
            ..Default::default()
        };
        let state = Arc::new(watch::Sender::new(initial));
        let pump = spawn_event_pump(engine.subscribe(), state.clone());

        engine.set_volume(volume);

        info!(lookup = catalog.is_some(), volume, "Player created");

        Self {
            engine,
            catalog,
            state,
            in_flight: AtomicUsize::new(0),
            pump,
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn current_video(&self) -> Option<Video> {
        self.state.borrow().current_video.clone()
    }

    pub fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    pub fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    pub fn progress(&self) -> f64 {
        self.state.borrow().progress
    }

    pub fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    pub fn is_muted(&self) -> bool {
        self.state.borrow().muted
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<Error> {
        self.state.borrow().last_error.clone()
    }

    /// Whether id-based loading is available
    pub fn has_lookup_service(&self) -> bool {
        self.catalog.is_some()
    }

    // Transport

    /// Start playback
    pub fn play(&self) {
        self.engine.play();
        self.state.send_if_modified(|s| s.set_phase(Phase::Playing));
    }

    /// Pause playback
    pub fn pause(&self) {
        self.engine.pause();
        self.state.send_if_modified(|s| s.set_phase(Phase::Paused));
    }

    /// Pause and rewind to the start
    pub fn stop(&self) {
        self.engine.pause();
        self.engine.seek(0.0);
        self.state.send_if_modified(|s| s.set_phase(Phase::Stopped));
    }

    /// Seek to an absolute position in seconds
    ///
    /// The position is not clamped; the engine decides what out-of-range
    /// values mean.
    pub fn seek(&self, seconds: f64) {
        debug!(seconds, "Seek");
        self.engine.seek(seconds);
    }

    /// Seek to a fraction of the duration
    pub fn seek_to_progress(&self, ratio: f64) {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        self.seek(ratio * self.duration());
    }

    // Audio

    /// Set the volume, clamped to 0.0..=1.0
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.engine.set_volume(volume);
        self.state.send_if_modified(|s| {
            let changed = s.volume != volume;
            s.volume = volume;
            changed
        });
    }

    pub fn set_muted(&self, muted: bool) {
        self.engine.set_muted(muted);
        self.state.send_if_modified(|s| {
            let changed = s.muted != muted;
            s.muted = muted;
            changed
        });
    }

    /// Flip the mute flag; returns the new value
    pub fn toggle_muted(&self) -> bool {
        let muted = !self.is_muted();
        self.set_muted(muted);
        muted
    }

    // Sources

    /// Replace the engine's sources with `videos`
    ///
    /// The first video becomes the current one and `is_loading` is cleared,
    /// even while id-based loads are still outstanding.
    pub fn set_videos(&self, videos: Vec<Video>) {
        info!(count = videos.len(), "Setting videos");
        self.state.send_modify(|s| {
            self.replace_sources(s, &videos);
            s.is_loading = false;
        });
    }

    /// Load a video by id through the lookup service
    #[instrument(skip(self))]
    pub async fn load_video_by_id(&self, video_id: &str) -> Result<Video> {
        let catalog = self.catalog()?;
        info!(video_id, "Loading video");

        let ticket = self.begin_load();
        let outcome = catalog.video(video_id).await;
        self.complete_load(ticket, outcome)
    }

    /// Load a video by reference id through the lookup service
    #[instrument(skip(self))]
    pub async fn load_video_by_reference_id(&self, reference_id: &str) -> Result<Video> {
        let catalog = self.catalog()?;
        info!(reference_id, "Loading video by reference id");

        let ticket = self.begin_load();
        let outcome = catalog.video_by_reference_id(reference_id).await;
        self.complete_load(ticket, outcome)
    }

    /// Resolve a playlist without touching playback state
    #[instrument(skip(self))]
    pub async fn fetch_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        self.catalog()?.playlist(playlist_id).await
    }

    /// Play a single URL, bypassing the lookup service
    ///
    /// Same as [`set_videos`](Self::set_videos) with one video.
    pub fn load_video_by_url(&self, url: Url) -> Video {
        info!(url = %url, "Loading video from URL");
        let video = Video::from_url(url);
        self.set_videos(vec![video.clone()]);
        video
    }

    /// Start a new session for `videos` in both the state and the engine
    ///
    /// Only called inside a `send_modify` closure. The engine call runs under
    /// the state lock, so `state.session` always names the engine's session.
    fn replace_sources(&self, s: &mut PlaybackState, videos: &[Video]) {
        let session = SessionId::new();
        s.start_session(session, videos.first().cloned());
        self.engine.set_sources(session, videos);
    }

    fn catalog(&self) -> Result<&Catalog> {
        self.catalog.as_ref().ok_or_else(|| {
            warn!("Id-based load requested without a lookup service");
            Error::NoLookupServiceConfigured
        })
    }

    fn begin_load(&self) -> LoadTicket<'_> {
        self.state.send_modify(|s| {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
            s.last_error = None;
            s.set_phase(Phase::Loading);
        });
        LoadTicket { player: self, settled: false }
    }

    fn complete_load(&self, mut ticket: LoadTicket<'_>, outcome: Result<Video>) -> Result<Video> {
        ticket.settled = true;
        if let Ok(video) = &outcome {
            info!(video_id = %video.id, sources = video.sources.len(), "Video loaded");
        }

        self.state.send_modify(|s| {
            let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            match &outcome {
                Ok(video) => self.replace_sources(s, slice::from_ref(video)),
                Err(e) => {
                    s.last_error = Some(e.clone());
                    s.set_phase(Phase::Error);
                }
            }
            s.is_loading = remaining > 0;
        });
        outcome
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Outstanding id-based load
///
/// Dropping an unsettled ticket (the load future was cancelled) still
/// releases its slot in the in-flight count.
struct LoadTicket<'a> {
    player: &'a Player,
    settled: bool,
}

impl Drop for LoadTicket<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let player = self.player;
        player.state.send_modify(|s| {
            let remaining = player.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            s.is_loading = remaining > 0;
        });
    }
}

fn spawn_event_pump(mut events: EngineEvents, state: Arc<watch::Sender<PlaybackState>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            state.send_if_modified(|s| s.apply(event));
        }
        debug!("Engine event stream closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCommand, SimulatedEngine};
    use crate::gateway::InMemoryGateway;
    use crate::model::{keys, PropertyValue, RawVideo};
    use std::time::Duration;

    fn simulated() -> (SimulatedEngine, Player) {
        let engine = SimulatedEngine::new();
        let player = Player::url_only(Arc::new(engine.clone()));
        (engine, player)
    }

    fn with_catalog(gateway: Arc<InMemoryGateway>) -> (SimulatedEngine, Player) {
        let engine = SimulatedEngine::new();
        let player = Player::with_gateway(PlayerConfig::default(), Arc::new(engine.clone()), Some(gateway))
            .unwrap();
        (engine, player)
    }

    fn raw_video(id: &str) -> RawVideo {
        let mut raw = RawVideo::default();
        raw.properties.insert(keys::ID.into(), PropertyValue::from(id));
        raw
    }

    async fn settle(player: &Player, until: impl FnMut(&PlaybackState) -> bool) -> PlaybackState {
        let mut rx = player.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(until))
            .await
            .expect("state did not settle")
            .expect("state sender dropped");
        state.clone()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (engine, player) = simulated();
        let state = player.state();

        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.volume, 1.0);
        assert!(!state.muted);
        assert!(state.session.is_none());
        assert!(!player.has_lookup_service());
        assert_eq!(engine.commands(), vec![EngineCommand::SetVolume(1.0)]);
    }

    #[tokio::test]
    async fn test_url_only_matches_configured_player() {
        let (url_engine, url_player) = simulated();
        let engine = SimulatedEngine::new();
        let configured =
            Player::with_gateway(PlayerConfig::default(), Arc::new(engine.clone()), None).unwrap();

        let (a, b) = (url_player.state(), configured.state());
        assert_eq!(a.phase, b.phase);
        assert_eq!(a.volume, b.volume);
        assert_eq!(a.muted, b.muted);
        assert_eq!(url_player.has_lookup_service(), configured.has_lookup_service());
        assert_eq!(url_engine.commands(), engine.commands());
    }

    #[tokio::test]
    async fn test_play_is_optimistic() {
        let (engine, player) = simulated();
        player.play();
        assert_eq!(player.phase(), Phase::Playing);
        player.play();
        assert_eq!(player.phase(), Phase::Playing);
        assert_eq!(
            engine.commands().iter().filter(|c| **c == EngineCommand::Play).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_stop_pauses_and_rewinds() {
        let (engine, player) = simulated();
        engine.clear_commands();

        player.play();
        player.stop();

        assert_eq!(player.phase(), Phase::Stopped);
        assert_eq!(
            engine.commands(),
            vec![EngineCommand::Play, EngineCommand::Pause, EngineCommand::Seek(0.0)]
        );
    }

    #[tokio::test]
    async fn test_seek_to_progress_clamps_ratio() {
        let (engine, player) = simulated();
        player.load_video_by_url(Url::parse("https://cdn.example.com/a.mp4").unwrap());
        engine.emit_duration(200.0);
        settle(&player, |s| s.duration == 200.0).await;
        engine.clear_commands();

        player.seek_to_progress(0.25);
        player.seek_to_progress(1.5);
        player.seek_to_progress(-1.0);
        player.seek(-5.0);

        assert_eq!(
            engine.commands(),
            vec![
                EngineCommand::Seek(50.0),
                EngineCommand::Seek(200.0),
                EngineCommand::Seek(0.0),
                EngineCommand::Seek(-5.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_volume_is_clamped_and_written_through() {
        let (engine, player) = simulated();
        engine.clear_commands();

        player.set_volume(1.7);
        assert_eq!(player.volume(), 1.0);
        player.set_volume(-0.2);
        assert_eq!(player.volume(), 0.0);
        assert!(player.toggle_muted());
        assert!(player.is_muted());

        assert_eq!(
            engine.commands(),
            vec![
                EngineCommand::SetVolume(1.0),
                EngineCommand::SetVolume(0.0),
                EngineCommand::SetMuted(true),
            ]
        );
    }

    #[tokio::test]
    async fn test_events_fold_into_progress() {
        let (engine, player) = simulated();
        player.load_video_by_url(Url::parse("https://cdn.example.com/a.m3u8").unwrap());

        engine.emit_progress(30.0);
        let state = settle(&player, |s| s.current_time == 30.0).await;
        assert_eq!(state.progress, 0.0);

        engine.emit_duration(120.0);
        let state = settle(&player, |s| s.duration == 120.0).await;
        assert_eq!(state.progress, 0.25);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let (engine, player) = simulated();
        player.load_video_by_url(Url::parse("https://cdn.example.com/a.m3u8").unwrap());
        assert_eq!(player.phase(), Phase::Loading);

        engine.emit_lifecycle(LifecycleKind::Play, None);
        settle(&player, |s| s.phase == Phase::Playing).await;

        engine.emit_lifecycle(LifecycleKind::End, None);
        settle(&player, |s| s.phase == Phase::Ended).await;

        engine.emit_lifecycle(LifecycleKind::Fail, None);
        let state = settle(&player, |s| s.phase == Phase::Error).await;
        assert!(matches!(state.last_error, Some(Error::PlaybackFailed(ref d)) if d == "unknown error"));
    }

    #[tokio::test]
    async fn test_stale_events_are_dropped() {
        let (engine, player) = simulated();
        player.load_video_by_url(Url::parse("https://cdn.example.com/old.mp4").unwrap());
        let old_session = engine.current_session().unwrap();

        player.load_video_by_url(Url::parse("https://cdn.example.com/new.mp4").unwrap());
        engine.emit_for(old_session, EngineEventKind::Progress { seconds: 99.0 });
        engine.emit_progress(5.0);

        let state = settle(&player, |s| s.current_time == 5.0).await;
        assert_eq!(state.session, engine.current_session());
        assert_eq!(state.current_video.unwrap().sources[0].url.path(), "/new.mp4");
    }

    #[tokio::test]
    async fn test_new_session_resets_position() {
        let (engine, player) = simulated();
        player.load_video_by_url(Url::parse("https://cdn.example.com/a.mp4").unwrap());
        engine.emit_duration(60.0);
        engine.emit_progress(30.0);
        settle(&player, |s| s.progress == 0.5).await;

        player.set_videos(vec![Video::new("b"), Video::new("c")]);
        let state = player.state();
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.duration, 0.0);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.phase, Phase::Loading);
        assert_eq!(state.current_video.map(|v| v.id), Some("b".to_string()));
        assert_eq!(state.session, engine.current_session());
    }

    #[tokio::test]
    async fn test_load_without_lookup_service() {
        let (engine, player) = simulated();
        engine.clear_commands();

        let err = player.load_video_by_id("abc").await.unwrap_err();
        assert!(matches!(err, Error::NoLookupServiceConfigured));

        let state = player.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.is_loading);
        assert!(state.last_error.is_none());
        assert!(engine.commands().is_empty());
    }

    #[tokio::test]
    async fn test_load_by_id_success() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_video(raw_video("abc"));
        let (engine, player) = with_catalog(gateway);

        let video = player.load_video_by_id("abc").await.unwrap();
        let state = player.state();

        assert_eq!(video.id, "abc");
        assert_eq!(state.current_video, Some(video));
        assert!(!state.is_loading);
        assert_eq!(state.phase, Phase::Loading);
        assert!(matches!(
            engine.commands().last(),
            Some(EngineCommand::SetSources { video_ids, .. }) if video_ids == &["abc".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_load_failure_sets_error() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.fail_video("abc", "timeout");
        let (_engine, player) = with_catalog(gateway);

        let err = player.load_video_by_id("abc").await.unwrap_err();
        assert!(matches!(err, Error::LookupFailed(_)));

        let state = player.state();
        assert_eq!(state.phase, Phase::Error);
        assert!(matches!(state.last_error, Some(Error::LookupFailed(_))));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_cancelled_load_releases_loading_flag() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_video(raw_video("slow"));
        gateway.delay_video("slow", Duration::from_secs(30));
        let (_engine, player) = with_catalog(gateway);

        let load = player.load_video_by_id("slow");
        let timed_out = tokio::time::timeout(Duration::from_millis(20), load).await;
        assert!(timed_out.is_err());
        assert!(!player.is_loading());
    }

    #[tokio::test]
    async fn test_url_load_clears_loading_flag() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_video(raw_video("slow"));
        gateway.delay_video("slow", Duration::from_millis(100));
        let (engine, player) = with_catalog(gateway);

        let load = player.load_video_by_id("slow");
        tokio::pin!(load);
        tokio::select! {
            _ = &mut load => panic!("load finished before its delay"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        assert!(player.is_loading());

        player.load_video_by_url(Url::parse("https://cdn.example.com/a.mp4").unwrap());
        assert!(!player.is_loading());
        assert_eq!(player.state().session, engine.current_session());

        let video = load.await.unwrap();
        let state = player.state();
        assert!(!state.is_loading);
        assert_eq!(state.current_video, Some(video));
        assert_eq!(state.session, engine.current_session());
    }

    #[tokio::test]
    async fn test_state_serializes_error_message() {
        let (engine, player) = simulated();
        player.load_video_by_url(Url::parse("https://cdn.example.com/a.mp4").unwrap());
        engine.emit_lifecycle(LifecycleKind::Fail, Some("decoder crashed"));
        let state = settle(&player, |s| s.phase == Phase::Error).await;

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"], "error");
        assert_eq!(json["last_error"], "Playback failed: decoder crashed");
    }
}
