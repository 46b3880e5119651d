//! Core types for Playhead

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;
use uuid::Uuid;

/// Identifier of one engine playback session
///
/// A new session starts every time the active source list is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing loaded yet
    #[default]
    Idle,
    /// Sources requested, waiting for the engine
    Loading,
    /// Content is playing
    Playing,
    /// Playback paused
    Paused,
    /// Stopped explicitly and rewound
    Stopped,
    /// Engine reached the end of the content
    Ended,
    /// Lookup or engine failure
    Error,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Loading => write!(f, "loading"),
            Phase::Playing => write!(f, "playing"),
            Phase::Paused => write!(f, "paused"),
            Phase::Stopped => write!(f, "stopped"),
            Phase::Ended => write!(f, "ended"),
            Phase::Error => write!(f, "error"),
        }
    }
}

/// Default base URL of the remote playback service
pub const DEFAULT_SERVICE_URL: &str = "https://edge.api.brightcove.com/playback/v1/";

/// Remote playback service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the playback API
    pub base_url: Url,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_SERVICE_URL).expect("default service URL is valid"),
            request_timeout_ms: 10_000,
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Account identifier for the lookup service
    pub account_id: Option<String>,
    /// Policy key for the lookup service
    pub policy_key: Option<String>,
    /// Optional auth token forwarded with every lookup
    pub auth_token: Option<String>,
    /// Volume applied to the engine at construction (0.0 to 1.0)
    pub initial_volume: f32,
    /// Remote service settings
    pub service: ServiceConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            policy_key: None,
            auth_token: None,
            initial_volume: 1.0,
            service: ServiceConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Configuration with lookup credentials
    pub fn with_credentials(account_id: impl Into<String>, policy_key: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            policy_key: Some(policy_key.into()),
            ..Default::default()
        }
    }

    /// Set the auth token sent with lookups
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Both the account id and the policy key are present and non-empty
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.account_id) && present(&self.policy_key)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        let config: PlayerConfig = serde_json::from_str(&contents)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::InvalidConfig(format!(
                "initial_volume must be within 0.0..=1.0, got {}",
                self.initial_volume
            )));
        }
        if self.service.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
