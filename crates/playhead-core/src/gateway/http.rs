//! HTTP binding of the remote playback API

use super::LookupGateway;
use crate::{
    error::GatewayError,
    model::{keys, map_from_json, PropertyValue, RawPlaylist, RawSource, RawVideo},
    types::ServiceConfig,
};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Gateway talking to the playback API over HTTPS
///
/// Requests carry the policy key in the `Accept` header and the optional auth
/// token as a bearer token. A 404 is reported as "no record".
pub struct PlaybackApiGateway {
    client: Client,
    base_url: Url,
    account_id: String,
    policy_key: String,
}

impl PlaybackApiGateway {
    pub fn new(
        account_id: impl Into<String>,
        policy_key: impl Into<String>,
        service: &ServiceConfig,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(service.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: service.base_url.clone(),
            account_id: account_id.into(),
            policy_key: policy_key.into(),
        })
    }

    fn endpoint(&self, collection: &str, key: &str) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Unavailable(format!("base URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["accounts", self.account_id.as_str(), collection, key]);
        Ok(url)
    }

    async fn fetch(&self, url: Url, auth_token: Option<&str>) -> Result<Option<Value>, GatewayError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, format!("application/json;pk={}", self.policy_key));
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Playback API response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }

        let body = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

#[async_trait]
impl LookupGateway for PlaybackApiGateway {
    #[instrument(skip(self, auth_token))]
    async fn find_video(
        &self,
        video_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<RawVideo>, GatewayError> {
        let url = self.endpoint("videos", video_id)?;
        Ok(self.fetch(url, auth_token).await?.map(video_from_api))
    }

    #[instrument(skip(self, auth_token))]
    async fn find_video_by_reference_id(
        &self,
        reference_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<RawVideo>, GatewayError> {
        let url = self.endpoint("videos", &format!("ref:{}", reference_id))?;
        Ok(self.fetch(url, auth_token).await?.map(video_from_api))
    }

    #[instrument(skip(self, auth_token))]
    async fn find_playlist(
        &self,
        playlist_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<RawPlaylist>, GatewayError> {
        let url = self.endpoint("playlists", playlist_id)?;
        Ok(self.fetch(url, auth_token).await?.map(playlist_from_api))
    }
}

/// Map an API video document onto the raw model
///
/// `sources[].src` becomes the URL and `sources[].type` the delivery method;
/// the API reports `duration` in milliseconds, the raw model in seconds.
pub(crate) fn video_from_api(value: Value) -> RawVideo {
    let Value::Object(mut doc) = value else {
        return RawVideo::default();
    };

    let sources = match doc.remove("sources") {
        Some(Value::Array(items)) => items.into_iter().filter_map(source_from_api).collect(),
        _ => Vec::new(),
    };

    let mut properties = map_from_json(doc);
    if let Some(ms) = properties.get(keys::DURATION).and_then(PropertyValue::as_f64) {
        properties.insert(keys::DURATION.into(), PropertyValue::Number(ms / 1000.0));
    }

    RawVideo { properties, sources }
}

fn source_from_api(value: Value) -> Option<RawSource> {
    let Value::Object(mut doc) = value else {
        return None;
    };
    let url = match doc.remove("src") {
        Some(Value::String(src)) => src,
        _ => return None,
    };

    let delivery_method = match doc.remove("type") {
        Some(Value::String(kind)) => Some(kind),
        _ => match doc.get("container").and_then(Value::as_str) {
            Some(container) if container.eq_ignore_ascii_case("mp4") => Some("video/mp4".to_string()),
            _ => None,
        },
    };

    let properties = map_from_json(doc);
    Some(RawSource { url, delivery_method, properties })
}

pub(crate) fn playlist_from_api(value: Value) -> RawPlaylist {
    let Value::Object(mut doc) = value else {
        return RawPlaylist::default();
    };
    let videos = match doc.remove("videos") {
        Some(Value::Array(items)) => items.into_iter().map(video_from_api).collect(),
        _ => Vec::new(),
    };
    RawPlaylist {
        properties: map_from_json(doc),
        videos,
    }
}
