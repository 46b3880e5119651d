//! Player engine boundary
//!
//! The engine decodes and renders media. The facade only issues
//! fire-and-forget commands and consumes the engine's event stream; events
//! may arrive on any thread and in any order between progress and duration.

mod simulated;

pub use simulated::{EngineCommand, SimulatedEngine};

use crate::{SessionId, Video};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receiving end of an engine subscription
pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

/// Lifecycle notifications reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    Play,
    Pause,
    End,
    Fail,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEventKind {
    /// Playhead position in seconds
    Progress { seconds: f64 },
    /// Content duration in seconds
    DurationChanged { seconds: f64 },
    Lifecycle {
        kind: LifecycleKind,
        detail: Option<String>,
    },
}

/// An engine event tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub session: SessionId,
    #[serde(flatten)]
    pub kind: EngineEventKind,
}

impl EngineEvent {
    pub fn progress(session: SessionId, seconds: f64) -> Self {
        Self { session, kind: EngineEventKind::Progress { seconds } }
    }

    pub fn duration_changed(session: SessionId, seconds: f64) -> Self {
        Self { session, kind: EngineEventKind::DurationChanged { seconds } }
    }

    pub fn lifecycle(session: SessionId, kind: LifecycleKind, detail: Option<String>) -> Self {
        Self { session, kind: EngineEventKind::Lifecycle { kind, detail } }
    }
}

/// Command surface of a concrete engine binding
///
/// Commands never block on the engine and never fail; outcomes are reported
/// through [`subscribe`](PlayerEngine::subscribe).
pub trait PlayerEngine: Send + Sync {
    fn play(&self);

    fn pause(&self);

    /// Seek to an absolute position; the value is passed through as given
    fn seek(&self, seconds: f64);

    /// Replace the active source list, starting `session`
    ///
    /// Every event produced for these sources must carry `session`. The
    /// player calls this while holding its state lock, so implementations
    /// must not call back into the player.
    fn set_sources(&self, session: SessionId, videos: &[Video]);

    fn set_volume(&self, volume: f32);

    fn set_muted(&self, muted: bool);

    /// Open a new event subscription
    fn subscribe(&self) -> EngineEvents;
}
