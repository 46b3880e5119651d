//! Ordered collections of videos

use super::raw::{keys, PropertyMap, PropertyValue, RawPlaylist};
use super::video::Video;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Playlist of videos in catalog order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub videos: Vec<Video>,
    pub properties: PropertyMap,
}

impl Playlist {
    pub fn new(id: impl Into<String>, videos: Vec<Video>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            videos,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Normalize a raw playlist; a missing id is generated
    pub fn from_raw(raw: &RawPlaylist) -> Self {
        let text = |key: &str| raw.get(key).and_then(PropertyValue::as_str).map(String::from);

        Self {
            id: text(keys::ID)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: text(keys::NAME),
            description: text(keys::DESCRIPTION),
            videos: raw.videos.iter().map(Video::from_raw).collect(),
            properties: raw.properties.clone(),
        }
    }

    pub fn to_raw(&self) -> RawPlaylist {
        let mut properties = self.properties.clone();
        properties.insert(keys::ID.into(), self.id.clone().into());
        if let Some(name) = &self.name {
            properties.insert(keys::NAME.into(), name.clone().into());
        }
        if let Some(description) = &self.description {
            properties.insert(keys::DESCRIPTION.into(), description.clone().into());
        }

        RawPlaylist {
            properties,
            videos: self.videos.iter().map(Video::to_raw).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Sum of the known video durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.videos.iter().map(|v| v.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_playlist_from_raw() {
        let raw = RawPlaylist::from_json(json!({
            "id": "pl-1",
            "name": "Shorts",
            "videos": [
                { "id": "a", "duration": 30 },
                { "id": "b", "duration": 45.5 },
                { "name": "no id" },
            ],
        }));

        let playlist = Playlist::from_raw(&raw);
        assert_eq!(playlist.id, "pl-1");
        assert_eq!(playlist.name.as_deref(), Some("Shorts"));
        assert!(playlist.description.is_none());
        assert_eq!(playlist.len(), 3);
        assert_eq!(playlist.videos[0].id, "a");
        assert!(!playlist.videos[2].id.is_empty());
        assert_eq!(playlist.total_duration(), 75.5);
    }

    #[test]
    fn test_playlist_generated_id() {
        let a = Playlist::from_raw(&RawPlaylist::default());
        let b = Playlist::from_raw(&RawPlaylist::default());
        assert!(a.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_playlist_round_trip() {
        let playlist = Playlist::new("pl", vec![Video::new("a"), Video::new("b")])
            .with_name("Mix")
            .with_description("Two videos");

        let back = Playlist::from_raw(&playlist.to_raw());
        assert_eq!(back.id, "pl");
        assert_eq!(back.name.as_deref(), Some("Mix"));
        assert_eq!(back.description.as_deref(), Some("Two videos"));
        assert_eq!(back.videos, playlist.videos);
    }
}
