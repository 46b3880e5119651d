//! Strongly-typed video and source value objects

use super::raw::{keys, PropertyMap, PropertyValue, RawSource, RawVideo};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use tracing::warn;
use url::Url;
use uuid::Uuid;

/// How a source is delivered to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Adaptive streaming (HLS)
    #[default]
    Hls,
    /// Progressive file download
    Mp4,
    /// DASH streaming
    Dash,
    Unknown,
}

impl DeliveryMethod {
    /// Wire value used in raw metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Hls => "application/x-mpegURL",
            DeliveryMethod::Mp4 => "video/mp4",
            DeliveryMethod::Dash => "application/dash+xml",
            DeliveryMethod::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("application/x-mpegURL") => DeliveryMethod::Hls,
            Some("video/mp4") => DeliveryMethod::Mp4,
            Some("application/dash+xml") => DeliveryMethod::Dash,
            _ => DeliveryMethod::Unknown,
        }
    }

    /// Guess from the URL's file extension, HLS when there is none
    pub fn infer_from_url(url: &Url) -> Self {
        let path = url.path().to_lowercase();
        if path.ends_with(".mpd") {
            DeliveryMethod::Dash
        } else if path.ends_with(".mp4") || path.ends_with(".m4v") || path.ends_with(".mov") {
            DeliveryMethod::Mp4
        } else {
            DeliveryMethod::Hls
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, DeliveryMethod::Hls)
    }
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMethod::Hls => write!(f, "HLS"),
            DeliveryMethod::Mp4 => write!(f, "MP4"),
            DeliveryMethod::Dash => write!(f, "DASH"),
            DeliveryMethod::Unknown => write!(f, "unknown"),
        }
    }
}

/// Quality tier derived from pixel count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoQuality {
    Unknown,
    Low,
    Standard,
    Hd,
    FullHd,
    UltraHd,
}

impl VideoQuality {
    /// Tier for a pixel count; each tier is `[lower, upper)`
    pub fn from_pixels(pixels: u64) -> Self {
        const STANDARD: u64 = 640 * 360;
        const HD: u64 = 1280 * 720;
        const FULL_HD: u64 = 1920 * 1080;
        const ULTRA_HD: u64 = 3840 * 2160;

        match pixels {
            p if p < STANDARD => VideoQuality::Low,
            p if p < HD => VideoQuality::Standard,
            p if p < FULL_HD => VideoQuality::Hd,
            p if p < ULTRA_HD => VideoQuality::FullHd,
            _ => VideoQuality::UltraHd,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VideoQuality::Unknown => "Unknown",
            VideoQuality::Low => "Low (360p)",
            VideoQuality::Standard => "Standard (480p)",
            VideoQuality::Hd => "HD (720p)",
            VideoQuality::FullHd => "Full HD (1080p)",
            VideoQuality::UltraHd => "Ultra HD (4K)",
        }
    }
}

impl std::fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Frame orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
    Square,
}

const DEFAULT_ASPECT_RATIO: f64 = 16.0 / 9.0;

/// A playable rendition of a [`Video`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Synthetic per-instance id, not part of equality
    pub instance_id: Uuid,
    pub url: Url,
    pub delivery_method: DeliveryMethod,
    pub media_type: Option<String>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Average bitrate in bits per second
    pub average_bitrate: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Remaining source properties
    pub properties: PropertyMap,
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.delivery_method == other.delivery_method
            && self.media_type == other.media_type
            && self.size == other.size
            && self.average_bitrate == other.average_bitrate
            && self.width == other.width
            && self.height == other.height
            && self.properties == other.properties
    }
}

impl Source {
    /// HLS source with no technical attributes
    pub fn new(url: Url) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            url,
            delivery_method: DeliveryMethod::default(),
            media_type: None,
            size: None,
            average_bitrate: None,
            width: None,
            height: None,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_delivery_method(mut self, method: DeliveryMethod) -> Self {
        self.delivery_method = method;
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_size(mut self, bytes: u64) -> Self {
        self.size = Some(bytes);
        self
    }

    pub fn with_average_bitrate(mut self, bps: u64) -> Self {
        self.average_bitrate = Some(bps);
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Normalize a raw source; `None` when its URL does not parse
    pub fn from_raw(raw: &RawSource) -> Option<Self> {
        let url = match Url::parse(&raw.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(url = %raw.url, error = %e, "Skipping source with invalid URL");
                return None;
            }
        };

        let props = &raw.properties;
        let dimension = |key: &str| {
            props
                .get(key)
                .and_then(PropertyValue::as_u64)
                .and_then(|v| u32::try_from(v).ok())
        };

        let mut properties = props.clone();
        for key in [keys::MEDIA_TYPE, keys::SIZE, keys::AVG_BITRATE, keys::WIDTH, keys::HEIGHT] {
            properties.remove(key);
        }

        Some(Self {
            instance_id: Uuid::new_v4(),
            url,
            delivery_method: DeliveryMethod::from_wire(raw.delivery_method.as_deref()),
            media_type: props.get(keys::MEDIA_TYPE).and_then(PropertyValue::as_str).map(String::from),
            size: props.get(keys::SIZE).and_then(PropertyValue::as_u64),
            average_bitrate: props.get(keys::AVG_BITRATE).and_then(PropertyValue::as_u64),
            width: dimension(keys::WIDTH),
            height: dimension(keys::HEIGHT),
            properties,
        })
    }

    pub fn to_raw(&self) -> RawSource {
        let mut properties = self.properties.clone();
        if let Some(media_type) = &self.media_type {
            properties.insert(keys::MEDIA_TYPE.into(), media_type.clone().into());
        }
        if let Some(size) = self.size {
            properties.insert(keys::SIZE.into(), size.into());
        }
        if let Some(bitrate) = self.average_bitrate {
            properties.insert(keys::AVG_BITRATE.into(), bitrate.into());
        }
        if let Some(width) = self.width {
            properties.insert(keys::WIDTH.into(), width.into());
        }
        if let Some(height) = self.height {
            properties.insert(keys::HEIGHT.into(), height.into());
        }

        RawSource {
            url: self.url.to_string(),
            delivery_method: Some(self.delivery_method.as_str().to_string()),
            properties,
        }
    }

    /// width × height, 0 when either is missing
    pub fn pixel_count(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => w as u64 * h as u64,
            _ => 0,
        }
    }

    pub fn quality_level(&self) -> VideoQuality {
        match (self.width, self.height) {
            (Some(w), Some(h)) => VideoQuality::from_pixels(w as u64 * h as u64),
            _ => VideoQuality::Unknown,
        }
    }

    /// width / height, 16:9 when unknown
    pub fn aspect_ratio(&self) -> f64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => w as f64 / h as f64,
            _ => DEFAULT_ASPECT_RATIO,
        }
    }

    pub fn orientation(&self) -> Orientation {
        let ratio = self.aspect_ratio();
        if ratio > 1.0 {
            Orientation::Landscape
        } else if ratio < 1.0 {
            Orientation::Portrait
        } else {
            Orientation::Square
        }
    }

    /// Average bitrate in Mbps
    pub fn estimated_bandwidth_mbps(&self) -> Option<f64> {
        self.average_bitrate.map(|bps| bps as f64 / 1_000_000.0)
    }

    /// Any property key mentions auth, token or drm
    pub fn requires_authentication(&self) -> bool {
        self.properties.keys().any(|key| {
            let key = key.to_lowercase();
            key.contains("auth") || key.contains("token") || key.contains("drm")
        })
    }

    /// Ranking key for [`Video::best_quality_source`]
    fn rank(&self) -> (bool, u64, u64) {
        (
            self.delivery_method.is_adaptive(),
            self.pixel_count(),
            self.average_bitrate.unwrap_or(0),
        )
    }
}

/// Immutable video value object
///
/// Equality and hashing use the identifier only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Duration in seconds, 0 when unknown
    pub duration: f64,
    pub thumbnail_url: Option<Url>,
    pub poster_url: Option<Url>,
    /// Sources in catalog order
    pub sources: Vec<Source>,
    /// Full property bag, well-known keys included
    pub properties: PropertyMap,
}

impl PartialEq for Video {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Video {}

impl Hash for Video {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Video {
    /// Empty video with an explicit identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            duration: 0.0,
            thumbnail_url: None,
            poster_url: None,
            sources: Vec::new(),
            properties: PropertyMap::new(),
        }
    }

    /// Empty video with a generated identifier
    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Single-source video for direct URL playback
    pub fn from_url(url: Url) -> Self {
        let method = DeliveryMethod::infer_from_url(&url);
        Self::with_generated_id().with_sources(vec![Source::new(url).with_delivery_method(method)])
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Negative or non-finite values are stored as 0
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = sanitize_duration(seconds);
        self
    }

    pub fn with_thumbnail(mut self, url: Url) -> Self {
        self.thumbnail_url = Some(url);
        self
    }

    pub fn with_poster(mut self, url: Url) -> Self {
        self.poster_url = Some(url);
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Attach an extra property; well-known keys are managed by the typed fields
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Normalize raw metadata; never fails
    pub fn from_raw(raw: &RawVideo) -> Self {
        let text = |key: &str| raw.get(key).and_then(PropertyValue::as_str).map(String::from);
        let link = |key: &str| raw.get(key).and_then(PropertyValue::as_str).and_then(|s| Url::parse(s).ok());

        let id = text(keys::ID)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            name: text(keys::NAME),
            description: text(keys::DESCRIPTION),
            duration: raw
                .get(keys::DURATION)
                .and_then(PropertyValue::as_f64)
                .map(sanitize_duration)
                .unwrap_or(0.0),
            thumbnail_url: link(keys::THUMBNAIL),
            poster_url: link(keys::POSTER),
            sources: raw.sources.iter().filter_map(Source::from_raw).collect(),
            properties: raw.properties.clone(),
            id,
        }
    }

    /// Raw form with well-known keys set from the typed fields
    pub fn to_raw(&self) -> RawVideo {
        let mut properties = self.properties.clone();
        properties.insert(keys::ID.into(), self.id.clone().into());
        properties.insert(keys::DURATION.into(), self.duration.into());

        let mut set_optional = |key: &str, value: Option<String>| match value {
            Some(v) => {
                properties.insert(key.into(), v.into());
            }
            None => {
                properties.remove(key);
            }
        };
        set_optional(keys::NAME, self.name.clone());
        set_optional(keys::DESCRIPTION, self.description.clone());
        set_optional(keys::THUMBNAIL, self.thumbnail_url.as_ref().map(Url::to_string));
        set_optional(keys::POSTER, self.poster_url.as_ref().map(Url::to_string));

        RawVideo {
            properties,
            sources: self.sources.iter().map(Source::to_raw).collect(),
        }
    }

    /// Highest-ranked source: HLS first, then resolution, then bitrate
    ///
    /// Ties resolve to the last equal source in sequence order.
    pub fn best_quality_source(&self) -> Option<&Source> {
        self.sources.iter().max_by_key(|source| source.rank())
    }

    pub fn hls_sources(&self) -> Vec<&Source> {
        self.sources_by(DeliveryMethod::Hls)
    }

    pub fn mp4_sources(&self) -> Vec<&Source> {
        self.sources_by(DeliveryMethod::Mp4)
    }

    pub fn sources_by(&self, method: DeliveryMethod) -> Vec<&Source> {
        self.sources.iter().filter(|s| s.delivery_method == method).collect()
    }

    /// Quality of the best source
    pub fn quality_level(&self) -> VideoQuality {
        self.best_quality_source()
            .map(Source::quality_level)
            .unwrap_or(VideoQuality::Unknown)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.best_quality_source()
            .map(Source::aspect_ratio)
            .unwrap_or(DEFAULT_ASPECT_RATIO)
    }

    pub fn orientation(&self) -> Orientation {
        self.best_quality_source()
            .map(Source::orientation)
            .unwrap_or(Orientation::Landscape)
    }

    pub fn estimated_bandwidth_mbps(&self) -> Option<f64> {
        self.best_quality_source().and_then(Source::estimated_bandwidth_mbps)
    }

    pub fn requires_authentication(&self) -> bool {
        self.sources.iter().any(Source::requires_authentication)
    }

    /// Thumbnail URL for a position, with the whole seconds in a `t` query parameter
    pub fn thumbnail_url_at(&self, seconds: f64) -> Option<Url> {
        let mut url = self.thumbnail_url.clone()?;
        let t = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
        url.query_pairs_mut().append_pair("t", &t.to_string());
        Some(url)
    }
}

fn sanitize_duration(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// http(s) URL with a known video extension or none at all
pub fn is_valid_video_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let last = url.path_segments().and_then(|mut s| s.next_back()).unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            matches!(ext.to_lowercase().as_str(), "mp4" | "mov" | "m4v" | "m3u8" | "mpd")
        }
        _ => true,
    }
}

/// Human-readable byte count using decimal units
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1000 {
        return format!("{} bytes", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = UNITS[0];
    for candidate in UNITS {
        value /= 1000.0;
        unit = candidate;
        if value < 1000.0 {
            break;
        }
    }
    format!("{:.1} {}", value, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn sized(w: u32, h: u32) -> Source {
        Source::new(url("https://cdn.example.com/v.mp4"))
            .with_delivery_method(DeliveryMethod::Mp4)
            .with_resolution(w, h)
    }

    #[test]
    fn test_quality_boundaries() {
        assert_eq!(sized(639, 360).quality_level(), VideoQuality::Low);
        assert_eq!(sized(640, 360).quality_level(), VideoQuality::Standard);
        assert_eq!(sized(1279, 720).quality_level(), VideoQuality::Standard);
        assert_eq!(sized(1280, 720).quality_level(), VideoQuality::Hd);
        assert_eq!(sized(1920, 1079).quality_level(), VideoQuality::Hd);
        assert_eq!(sized(1920, 1080).quality_level(), VideoQuality::FullHd);
        assert_eq!(sized(3840, 2159).quality_level(), VideoQuality::FullHd);
        assert_eq!(sized(3840, 2160).quality_level(), VideoQuality::UltraHd);
        assert_eq!(sized(0, 0).quality_level(), VideoQuality::Low);
    }

    #[test]
    fn test_quality_unknown_without_dimensions() {
        let source = Source::new(url("https://cdn.example.com/v.m3u8"));
        assert_eq!(source.quality_level(), VideoQuality::Unknown);

        let mut half = source.clone();
        half.width = Some(1920);
        assert_eq!(half.quality_level(), VideoQuality::Unknown);
    }

    #[test]
    fn test_quality_ordering() {
        assert!(VideoQuality::UltraHd > VideoQuality::FullHd);
        assert!(VideoQuality::Low > VideoQuality::Unknown);
        assert_eq!(VideoQuality::Hd.to_string(), "HD (720p)");
    }

    #[test]
    fn test_best_source_prefers_hls() {
        let video = Video::new("v").with_sources(vec![
            sized(3840, 2160).with_average_bitrate(20_000_000),
            Source::new(url("https://cdn.example.com/master.m3u8")),
            sized(1920, 1080),
        ]);

        let best = video.best_quality_source().unwrap();
        assert_eq!(best.delivery_method, DeliveryMethod::Hls);
    }

    #[test]
    fn test_best_source_resolution_then_bitrate() {
        let video = Video::new("v").with_sources(vec![
            sized(1280, 720).with_average_bitrate(9_000_000),
            sized(1920, 1080).with_average_bitrate(3_000_000),
            sized(1920, 1080).with_average_bitrate(5_000_000),
            sized(1920, 1080).with_average_bitrate(4_000_000),
        ]);

        let best = video.best_quality_source().unwrap();
        assert_eq!(best.pixel_count(), 1920 * 1080);
        assert_eq!(best.average_bitrate, Some(5_000_000));
    }

    #[test]
    fn test_best_source_non_adaptive_methods_share_a_tier() {
        let dash = sized(1280, 720).with_delivery_method(DeliveryMethod::Dash);
        let mp4 = sized(1920, 1080);
        let video = Video::new("v").with_sources(vec![dash, mp4]);

        assert_eq!(video.best_quality_source().unwrap().delivery_method, DeliveryMethod::Mp4);
    }

    #[test]
    fn test_best_source_ties_are_deterministic() {
        let a = sized(1920, 1080).with_average_bitrate(1);
        let b = sized(1920, 1080).with_average_bitrate(1);
        let video = Video::new("v").with_sources(vec![a, b]);

        let first = video.best_quality_source().unwrap().instance_id;
        for _ in 0..10 {
            assert_eq!(video.best_quality_source().unwrap().instance_id, first);
        }
    }

    #[test]
    fn test_best_source_empty() {
        assert!(Video::new("v").best_quality_source().is_none());
        assert_eq!(Video::new("v").quality_level(), VideoQuality::Unknown);
    }

    #[test]
    fn test_equality_by_id_only() {
        let a = Video::new("same").with_name("A").with_duration(10.0);
        let b = Video::new("same").with_name("B");
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_source_equality_ignores_instance_id() {
        let a = sized(640, 360);
        let b = sized(640, 360);
        assert_ne!(a.instance_id, b.instance_id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_orientation_and_aspect() {
        assert_eq!(sized(1920, 1080).orientation(), Orientation::Landscape);
        assert_eq!(sized(1080, 1920).orientation(), Orientation::Portrait);
        assert_eq!(sized(500, 500).orientation(), Orientation::Square);
        assert_eq!(sized(100, 0).aspect_ratio(), 16.0 / 9.0);
    }

    #[test]
    fn test_requires_authentication() {
        let plain = sized(640, 360);
        let protected = sized(640, 360).with_property("DRM_scheme", "widevine");
        assert!(!Video::new("a").with_sources(vec![plain.clone()]).requires_authentication());
        assert!(Video::new("b").with_sources(vec![plain, protected]).requires_authentication());
    }

    #[test]
    fn test_thumbnail_at_time() {
        let video = Video::new("v").with_thumbnail(url("https://img.example.com/thumb.jpg"));
        assert_eq!(
            video.thumbnail_url_at(42.9).unwrap().as_str(),
            "https://img.example.com/thumb.jpg?t=42"
        );
        assert!(Video::new("v").thumbnail_url_at(1.0).is_none());
    }

    #[test]
    fn test_valid_video_urls() {
        assert!(is_valid_video_url(&url("https://cdn.example.com/a.MP4")));
        assert!(is_valid_video_url(&url("https://cdn.example.com/master.m3u8")));
        assert!(is_valid_video_url(&url("https://cdn.example.com/stream")));
        assert!(!is_valid_video_url(&url("https://cdn.example.com/a.avi")));
        assert!(!is_valid_video_url(&url("ftp://cdn.example.com/a.mp4")));
    }

    #[test]
    fn test_from_url_infers_delivery() {
        let mp4 = Video::from_url(url("https://x/video.mp4"));
        assert_eq!(mp4.sources.len(), 1);
        assert_eq!(mp4.sources[0].delivery_method, DeliveryMethod::Mp4);
        assert!(!mp4.id.is_empty());

        let hls = Video::from_url(url("https://x/master.m3u8"));
        assert_eq!(hls.sources[0].delivery_method, DeliveryMethod::Hls);
        assert_ne!(hls, mp4);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 bytes");
        assert_eq!(format_file_size(1_500), "1.5 KB");
        assert_eq!(format_file_size(1_200_000), "1.2 MB");
        assert_eq!(format_file_size(3_000_000_000), "3.0 GB");
    }
}
