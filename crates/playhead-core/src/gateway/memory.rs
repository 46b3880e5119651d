//! Gateway backed by an in-memory catalog

use super::LookupGateway;
use crate::{
    error::GatewayError,
    model::{keys, PropertyValue, RawPlaylist, RawVideo},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Key holding a video's reference id
pub const REFERENCE_ID_KEY: &str = "reference_id";

#[derive(Default)]
struct Inner {
    videos: HashMap<String, RawVideo>,
    playlists: HashMap<String, RawPlaylist>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    lookups: usize,
    last_auth_token: Option<String>,
}

/// Catalog held in memory, with optional per-key failures and delays
#[derive(Default)]
pub struct InMemoryGateway {
    inner: Mutex<Inner>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load `{ "videos": [...], "playlists": [...] }` from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let contents = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;
        Ok(Self::from_json(value))
    }

    pub fn from_json(value: Value) -> Self {
        let gateway = Self::new();
        if let Value::Object(mut map) = value {
            if let Some(Value::Array(videos)) = map.remove("videos") {
                for video in videos {
                    gateway.insert_video(RawVideo::from_json(video));
                }
            }
            if let Some(Value::Array(playlists)) = map.remove("playlists") {
                for playlist in playlists {
                    gateway.insert_playlist(RawPlaylist::from_json(playlist));
                }
            }
        }
        gateway
    }

    /// Add a video under its `id` property; records without one are ignored
    pub fn insert_video(&self, raw: RawVideo) {
        if let Some(id) = raw.get(keys::ID).and_then(PropertyValue::as_str) {
            let id = id.to_string();
            self.lock().videos.insert(id, raw);
        }
    }

    pub fn insert_playlist(&self, raw: RawPlaylist) {
        if let Some(id) = raw.get(keys::ID).and_then(PropertyValue::as_str) {
            let id = id.to_string();
            self.lock().playlists.insert(id, raw);
        }
    }

    /// Make lookups of `key` fail with an unavailable error
    pub fn fail_video(&self, key: impl Into<String>, message: impl Into<String>) {
        self.lock().failures.insert(key.into(), message.into());
    }

    /// Delay answers for `key`
    pub fn delay_video(&self, key: impl Into<String>, delay: Duration) {
        self.lock().delays.insert(key.into(), delay);
    }

    /// Number of lookups served so far
    pub fn lookup_count(&self) -> usize {
        self.lock().lookups
    }

    pub fn last_auth_token(&self) -> Option<String> {
        self.lock().last_auth_token.clone()
    }

    pub fn video_count(&self) -> usize {
        self.lock().videos.len()
    }

    /// Record the request and return the delay and failure configured for `key`
    fn begin(&self, key: &str, auth_token: Option<&str>) -> (Option<Duration>, Option<String>) {
        let mut inner = self.lock();
        inner.lookups += 1;
        inner.last_auth_token = auth_token.map(String::from);
        (inner.delays.get(key).copied(), inner.failures.get(key).cloned())
    }

    async fn answer<T>(
        &self,
        key: &str,
        auth_token: Option<&str>,
        find: impl FnOnce(&Inner) -> Option<T>,
    ) -> Result<Option<T>, GatewayError> {
        let (delay, failure) = self.begin(key, auth_token);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = failure {
            return Err(GatewayError::Unavailable(message));
        }
        Ok(find(&self.lock()))
    }
}

#[async_trait]
impl LookupGateway for InMemoryGateway {
    async fn find_video(
        &self,
        video_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<RawVideo>, GatewayError> {
        self.answer(video_id, auth_token, |inner| inner.videos.get(video_id).cloned())
            .await
    }

    async fn find_video_by_reference_id(
        &self,
        reference_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<RawVideo>, GatewayError> {
        self.answer(reference_id, auth_token, |inner| {
            inner
                .videos
                .values()
                .find(|v| v.get(REFERENCE_ID_KEY).and_then(PropertyValue::as_str) == Some(reference_id))
                .cloned()
        })
        .await
    }

    async fn find_playlist(
        &self,
        playlist_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<RawPlaylist>, GatewayError> {
        self.answer(playlist_id, auth_token, |inner| inner.playlists.get(playlist_id).cloned())
            .await
    }
}
