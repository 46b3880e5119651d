//! In-process engine that records commands and emits scripted events

use super::{EngineEvent, EngineEventKind, EngineEvents, LifecycleKind, PlayerEngine};
use crate::{SessionId, Video};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// A command received by [`SimulatedEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Play,
    Pause,
    Seek(f64),
    SetSources { session: SessionId, video_ids: Vec<String> },
    SetVolume(f32),
    SetMuted(bool),
}

#[derive(Default)]
struct Inner {
    commands: Vec<EngineCommand>,
    session: Option<SessionId>,
    subscribers: Vec<mpsc::UnboundedSender<EngineEvent>>,
}

/// Engine binding with no media pipeline
///
/// Cloning yields another handle to the same engine, so a test or driver can
/// keep one handle for emitting events after giving the other to a
/// [`Player`](crate::Player).
#[derive(Clone, Default)]
pub struct SimulatedEngine {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a panicking test thread; the data is still usable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, command: EngineCommand) {
        debug!(?command, "Engine command");
        self.lock().commands.push(command);
    }

    /// Commands received so far, oldest first
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// Session started by the most recent `set_sources`
    pub fn current_session(&self) -> Option<SessionId> {
        self.lock().session
    }

    fn deliver(&self, event: EngineEvent) {
        self.lock()
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Session that events without an explicit one are tagged with
    ///
    /// Before any sources were set, events carry a fresh session id.
    fn event_session(&self) -> SessionId {
        self.current_session().unwrap_or_default()
    }

    /// Deliver an event tagged with an explicit session
    pub fn emit_for(&self, session: SessionId, kind: EngineEventKind) {
        self.deliver(EngineEvent { session, kind });
    }

    pub fn emit_progress(&self, seconds: f64) {
        self.deliver(EngineEvent::progress(self.event_session(), seconds));
    }

    pub fn emit_duration(&self, seconds: f64) {
        self.deliver(EngineEvent::duration_changed(self.event_session(), seconds));
    }

    pub fn emit_lifecycle(&self, kind: LifecycleKind, detail: Option<&str>) {
        self.deliver(EngineEvent::lifecycle(
            self.event_session(),
            kind,
            detail.map(String::from),
        ));
    }
}

impl PlayerEngine for SimulatedEngine {
    fn play(&self) {
        self.record(EngineCommand::Play);
    }

    fn pause(&self) {
        self.record(EngineCommand::Pause);
    }

    fn seek(&self, seconds: f64) {
        self.record(EngineCommand::Seek(seconds));
    }

    fn set_sources(&self, session: SessionId, videos: &[Video]) {
        self.record(EngineCommand::SetSources {
            session,
            video_ids: videos.iter().map(|v| v.id.clone()).collect(),
        });
        self.lock().session = Some(session);
    }

    fn set_volume(&self, volume: f32) {
        self.record(EngineCommand::SetVolume(volume));
    }

    fn set_muted(&self, muted: bool) {
        self.record(EngineCommand::SetMuted(muted));
    }

    fn subscribe(&self) -> EngineEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_commands_in_order() {
        let engine = SimulatedEngine::new();
        let session = SessionId::new();

        engine.play();
        engine.seek(12.5);
        engine.set_sources(session, &[Video::new("a")]);
        engine.set_muted(true);

        assert_eq!(
            engine.commands(),
            vec![
                EngineCommand::Play,
                EngineCommand::Seek(12.5),
                EngineCommand::SetSources { session, video_ids: vec!["a".into()] },
                EngineCommand::SetMuted(true),
            ]
        );
        assert_eq!(engine.current_session(), Some(session));
    }

    #[test]
    fn test_events_reach_all_subscribers() {
        let engine = SimulatedEngine::new();
        let session = SessionId::new();
        engine.set_sources(session, &[]);

        let mut first = engine.subscribe();
        let mut second = engine.subscribe();
        engine.emit_duration(120.0);

        let expected = EngineEvent::duration_changed(session, 120.0);
        assert_eq!(first.try_recv().unwrap(), expected);
        assert_eq!(second.try_recv().unwrap(), expected);
    }

    #[test]
    fn test_closed_subscribers_are_dropped() {
        let engine = SimulatedEngine::new();
        drop(engine.subscribe());
        let mut live = engine.subscribe();

        engine.emit_progress(1.0);
        engine.emit_progress(2.0);

        assert_eq!(engine.lock().subscribers.len(), 1);
        assert!(live.try_recv().is_ok());
        assert!(live.try_recv().is_ok());
    }
}
