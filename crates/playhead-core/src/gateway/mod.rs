//! Lookup gateway boundary
//!
//! A gateway resolves identifiers to raw metadata. [`Catalog`] turns gateway
//! answers into model values and the player's error kinds.

mod http;
mod memory;

pub use http::PlaybackApiGateway;
pub use memory::InMemoryGateway;

use crate::{
    error::GatewayError,
    model::{Playlist, RawPlaylist, RawVideo, Video},
    Error, Result,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Remote metadata service
///
/// `Ok(None)` means the service answered but has no such record.
#[async_trait]
pub trait LookupGateway: Send + Sync {
    async fn find_video(
        &self,
        video_id: &str,
        auth_token: Option<&str>,
    ) -> std::result::Result<Option<RawVideo>, GatewayError>;

    async fn find_video_by_reference_id(
        &self,
        reference_id: &str,
        auth_token: Option<&str>,
    ) -> std::result::Result<Option<RawVideo>, GatewayError>;

    async fn find_playlist(
        &self,
        playlist_id: &str,
        auth_token: Option<&str>,
    ) -> std::result::Result<Option<RawPlaylist>, GatewayError>;
}

/// Gateway plus the auth token sent with every request
#[derive(Clone)]
pub struct Catalog {
    gateway: Arc<dyn LookupGateway>,
    auth_token: Option<String>,
}

impl Catalog {
    pub fn new(gateway: Arc<dyn LookupGateway>, auth_token: Option<String>) -> Self {
        Self { gateway, auth_token }
    }

    fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Resolve a video by id
    pub async fn video(&self, video_id: &str) -> Result<Video> {
        let raw = self.gateway.find_video(video_id, self.token()).await;
        resolve(raw, video_id).map(|raw| Video::from_raw(&raw))
    }

    /// Resolve a video by reference id
    pub async fn video_by_reference_id(&self, reference_id: &str) -> Result<Video> {
        let raw = self
            .gateway
            .find_video_by_reference_id(reference_id, self.token())
            .await;
        resolve(raw, reference_id).map(|raw| Video::from_raw(&raw))
    }

    /// Resolve a playlist by id
    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let raw = self.gateway.find_playlist(playlist_id, self.token()).await;
        resolve(raw, playlist_id).map(|raw| Playlist::from_raw(&raw))
    }
}

fn resolve<T>(answer: std::result::Result<Option<T>, GatewayError>, key: &str) -> Result<T> {
    match answer {
        Ok(Some(raw)) => {
            debug!(key, "Lookup resolved");
            Ok(raw)
        }
        Ok(None) => {
            warn!(key, "Lookup returned no record");
            Err(Error::VideoNotFound)
        }
        Err(e) => {
            warn!(key, error = %e, "Lookup failed");
            Err(Error::lookup(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{keys, PropertyValue};

    fn raw_video(id: &str) -> RawVideo {
        let mut raw = RawVideo::default();
        raw.properties.insert(keys::ID.into(), PropertyValue::from(id));
        raw
    }

    #[tokio::test]
    async fn test_catalog_maps_answers() {
        let gateway = InMemoryGateway::new();
        gateway.insert_video(raw_video("known"));
        gateway.fail_video("broken", "connection reset");

        let catalog = Catalog::new(Arc::new(gateway), None);

        let video = catalog.video("known").await.unwrap();
        assert_eq!(video.id, "known");

        assert!(matches!(catalog.video("missing").await, Err(Error::VideoNotFound)));
        assert!(matches!(catalog.video("broken").await, Err(Error::LookupFailed(_))));
    }

    #[tokio::test]
    async fn test_catalog_forwards_auth_token() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.insert_video(raw_video("v"));

        let catalog = Catalog::new(gateway.clone(), Some("secret".into()));
        catalog.video("v").await.unwrap();

        assert_eq!(gateway.last_auth_token().as_deref(), Some("secret"));
    }
}
