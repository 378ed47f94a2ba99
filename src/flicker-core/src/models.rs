use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of a playlist: a single playable input plus whatever metadata
/// openers and scrapers have attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Position within the owning playlist.
    pub index: usize,
    /// Locator the opener understands (path, `file://` URL, ...).
    pub url: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Duration in seconds when known.
    pub duration_seconds: Option<u32>,
    /// Provider-specific extras (e.g. the opener's name or a container hint).
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl PlaylistItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Self::default()
        }
    }
}

/// An audio stream embedded in the opened input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioStream {
    pub index: usize,
    pub codec: String,
    pub language: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bits per second; 0 when unknown.
    pub bitrate: u64,
}

/// A video stream embedded in the opened input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoStream {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub bitrate: u64,
}

/// A data (timed metadata) stream embedded in the opened input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataStream {
    pub index: usize,
    pub codec: String,
}

/// Audio that lives outside the opened input and is sourced by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalAudioStream {
    pub url: String,
    pub codec: Option<String>,
    pub language: Option<String>,
    pub sample_rate: Option<u32>,
}

/// Video that lives outside the opened input and is sourced by a provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternalVideoStream {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

/// A subtitles track opened by an OpenSubtitles provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitlesStream {
    pub url: String,
    /// Container/format hint such as `srt` or `vtt`.
    pub format: String,
    pub language: Option<String>,
}
