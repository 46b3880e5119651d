//! Loosely-typed metadata as delivered by the engine and the lookup service

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Well-known keys in a video property bag
pub mod keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const DURATION: &str = "duration";
    pub const THUMBNAIL: &str = "thumbnail";
    pub const POSTER: &str = "poster";

    pub const MEDIA_TYPE: &str = "media_type";
    pub const SIZE: &str = "size";
    pub const AVG_BITRATE: &str = "avg_bitrate";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
}

/// String-keyed property bag
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A single metadata value
///
/// Unknown keys keep their value in this form so newer metadata survives a
/// round trip through the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<PropertyValue>),
    Map(PropertyMap),
}

impl PropertyValue {
    /// Convert a JSON value; `null` has no representation
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(PropertyValue::Bool(b)),
            Value::Number(n) => n.as_f64().map(PropertyValue::Number),
            Value::String(s) => Some(PropertyValue::String(s)),
            Value::Array(items) => Some(PropertyValue::List(
                items.into_iter().filter_map(PropertyValue::from_json).collect(),
            )),
            Value::Object(map) => Some(PropertyValue::Map(map_from_json(map))),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PropertyValue::Map(map) => Value::Object(map_to_json(map)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value; numeric strings are accepted as well
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-negative integral value
    pub fn as_u64(&self) -> Option<u64> {
        self.as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<u64> for PropertyValue {
    fn from(n: u64) -> Self {
        PropertyValue::Number(n as f64)
    }
}

impl From<u32> for PropertyValue {
    fn from(n: u32) -> Self {
        PropertyValue::Number(n as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

pub(crate) fn map_from_json(map: serde_json::Map<String, Value>) -> PropertyMap {
    map.into_iter()
        .filter_map(|(k, v)| PropertyValue::from_json(v).map(|v| (k, v)))
        .collect()
}

pub(crate) fn map_to_json(map: &PropertyMap) -> serde_json::Map<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

/// Raw rendition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl RawSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            delivery_method: None,
            properties: PropertyMap::new(),
        }
    }

    /// Parse `{ "url": ..., "delivery_method": ..., ...properties }`
    ///
    /// Returns `None` when there is no string `url`.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let url = match map.remove("url") {
            Some(Value::String(url)) => url,
            _ => return None,
        };
        let delivery_method = match map.remove("delivery_method") {
            Some(Value::String(method)) => Some(method),
            _ => None,
        };
        // Properties may be nested or flattened next to url
        let mut properties = match map.remove("properties") {
            Some(Value::Object(nested)) => map_from_json(nested),
            _ => PropertyMap::new(),
        };
        properties.extend(map_from_json(map));
        Some(Self { url, delivery_method, properties })
    }

    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("url".into(), Value::String(self.url.clone()));
        if let Some(method) = &self.delivery_method {
            map.insert("delivery_method".into(), Value::String(method.clone()));
        }
        map.insert("properties".into(), Value::Object(map_to_json(&self.properties)));
        Value::Object(map)
    }
}

/// Raw video record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawVideo {
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub sources: Vec<RawSource>,
}

impl RawVideo {
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Parse `{ "sources": [...], ...properties }`
    ///
    /// Sources that are not objects with a string `url` are skipped.
    pub fn from_json(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        let sources = match map.remove("sources") {
            Some(Value::Array(items)) => items.into_iter().filter_map(RawSource::from_json).collect(),
            _ => Vec::new(),
        };
        let mut properties = match map.remove("properties") {
            Some(Value::Object(nested)) => map_from_json(nested),
            _ => PropertyMap::new(),
        };
        properties.extend(map_from_json(map));
        Self { properties, sources }
    }

    pub fn to_json(&self) -> Value {
        let mut map = map_to_json(&self.properties);
        map.insert(
            "sources".into(),
            Value::Array(self.sources.iter().map(RawSource::to_json).collect()),
        );
        Value::Object(map)
    }
}

/// Raw playlist record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlaylist {
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub videos: Vec<RawVideo>,
}

impl RawPlaylist {
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Parse `{ "videos": [...], ...properties }`
    pub fn from_json(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        let videos = match map.remove("videos") {
            Some(Value::Array(items)) => items.into_iter().map(RawVideo::from_json).collect(),
            _ => Vec::new(),
        };
        Self {
            properties: map_from_json(map),
            videos,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = map_to_json(&self.properties);
        map.insert(
            "videos".into(),
            Value::Array(self.videos.iter().map(RawVideo::to_json).collect()),
        );
        Value::Object(map)
    }
}
