//! Video, source and playlist model
//!
//! Raw metadata arrives as string-keyed property bags ([`RawVideo`],
//! [`RawSource`], [`RawPlaylist`]). Normalization never fails: optional
//! attributes degrade to `None` and a missing identifier is generated.

mod playlist;
mod raw;
mod video;

pub use playlist::Playlist;
pub(crate) use raw::map_from_json;
pub use raw::{keys, PropertyMap, PropertyValue, RawPlaylist, RawSource, RawVideo};
pub use video::{
    format_file_size, is_valid_video_url, DeliveryMethod, Orientation, Source, Video, VideoQuality,
};
