//! Error types for Playhead Core

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
///
/// `Error` is `Clone` so it can be stored in the published
/// [`PlaybackState`](crate::PlaybackState) snapshot; lookup causes are shared
/// behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Lookup errors
    #[error("No lookup service configured: an account id and policy key are required")]
    NoLookupServiceConfigured,

    #[error("Failed to load video: {0}")]
    LookupFailed(#[source] Arc<GatewayError>),

    #[error("Video not found")]
    VideoNotFound,

    // Playback errors
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap a gateway failure
    pub fn lookup(err: GatewayError) -> Self {
        Error::LookupFailed(Arc::new(err))
    }

    /// Returns true if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::LookupFailed(cause) => cause.is_transient(),
            Error::PlaybackFailed(_) => true,
            Error::NoLookupServiceConfigured
            | Error::VideoNotFound
            | Error::InvalidConfig(_) => false,
        }
    }

    /// Returns a stable error code for logs and CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NoLookupServiceConfigured => "NO_LOOKUP_SERVICE",
            Error::LookupFailed(_) => "LOOKUP_FAILED",
            Error::VideoNotFound => "VIDEO_NOT_FOUND",
            Error::PlaybackFailed(_) => "PLAYBACK_FAILED",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

impl From<GatewayError> for Error {
    fn from(err: GatewayError) -> Self {
        Error::lookup(err)
    }
}

/// Errors raised by a [`LookupGateway`](crate::gateway::LookupGateway)
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Playback service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lookup service unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Returns true for failures that a later retry could clear
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Http(e) => e.is_timeout() || e.is_connect(),
            GatewayError::Status { status, .. } => *status >= 500 || *status == 429,
            GatewayError::Unavailable(_) => true,
            GatewayError::Decode(_) | GatewayError::InvalidUrl(_) | GatewayError::Io(_) => false,
        }
    }
}
