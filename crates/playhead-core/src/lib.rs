//! Playhead Core - Playback state facade for an external player engine
//!
//! This crate provides:
//! - A video/source model normalized from loosely-typed metadata
//! - An engine boundary with session-tagged event delivery
//! - A lookup gateway for resolving videos and playlists by id
//! - The [`Player`] facade publishing an observable [`PlaybackState`]
//! - Time and progress formatting helpers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Playhead Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐                          ┌──────────────┐     │
//! │  │    Lookup    │  RawVideo    ┌───────┐   │    Engine    │     │
//! │  │   Gateway    ├─────────────▶│ Model │   │   Adapter    │     │
//! │  └──────┬───────┘              └───┬───┘   └───┬──────▲───┘     │
//! │         │ Catalog                  │ Video     │      │         │
//! │         │                          │   events  │      │ cmds    │
//! │         │                   ┌──────▼──────┐    │      │         │
//! │         └──────────────────▶│   Player    │◀───┘      │         │
//! │                             │  (facade)   ├───────────┘         │
//! │                             └──────┬──────┘                     │
//! │                                    │ watch                      │
//! │                             ┌──────▼──────┐                     │
//! │                             │  Playback   │                     │
//! │                             │    State    │                     │
//! │                             └─────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod gateway;
pub mod model;
pub mod player;
pub mod time;
pub mod types;

pub use engine::{
    EngineCommand, EngineEvent, EngineEventKind, EngineEvents, LifecycleKind, PlayerEngine,
    SimulatedEngine,
};
pub use error::{Error, GatewayError, Result};
pub use gateway::{Catalog, InMemoryGateway, LookupGateway, PlaybackApiGateway};
pub use model::{
    DeliveryMethod, Orientation, Playlist, PropertyMap, PropertyValue, RawPlaylist, RawSource,
    RawVideo, Source, Video, VideoQuality,
};
pub use player::{PlaybackState, Player};
pub use time::TimeFormat;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Playhead Core initialized");
}
