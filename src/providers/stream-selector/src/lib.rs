//! Picks the playlist item and the embedded streams to play from user
//! preferences.
//!
//! Options: `priority`, `language` (e.g. `en`, matched case-insensitively
//! against the start of the stream language) and `max_height` (video height cap
//! in pixels).

use flicker_core::provider::ProviderResult;
use flicker_core::{
    AudioStream, ConstructProvider, Playlist, Provider, ProviderContext, ProviderDescriptor,
    SuggestAudioStreamCapability, SuggestPlaylistItemCapability, SuggestVideoStreamCapability,
    VideoStream, DEFAULT_PRIORITY,
};
use std::cmp::Ordering;
use std::sync::Arc;

pub const PREFERRED_STREAM_PROVIDER: &str = "preferred-stream";

pub fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::of::<PreferredStreamProvider>(
        PREFERRED_STREAM_PROVIDER,
        env!("CARGO_PKG_VERSION"),
    )
}

#[derive(Debug, Clone)]
pub struct PreferredStreamProvider {
    priority: i32,
    language: Option<String>,
    max_height: Option<u32>,
}

impl Default for PreferredStreamProvider {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            language: None,
            max_height: None,
        }
    }
}

impl PreferredStreamProvider {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into().to_ascii_lowercase());
        self
    }

    pub fn with_max_height(mut self, max_height: u32) -> Self {
        self.max_height = Some(max_height);
        self
    }

    fn speaks(&self, stream: &AudioStream) -> bool {
        match (&self.language, &stream.language) {
            (Some(wanted), Some(language)) => language.to_ascii_lowercase().starts_with(wanted),
            _ => false,
        }
    }

    fn fits(&self, stream: &VideoStream) -> bool {
        self.max_height.map_or(true, |cap| stream.height <= cap)
    }
}

impl ConstructProvider for PreferredStreamProvider {
    fn construct(ctx: &ProviderContext) -> ProviderResult<Self> {
        let mut provider = Self {
            priority: ctx.parse_option("priority")?.unwrap_or(DEFAULT_PRIORITY),
            ..Self::default()
        };
        if let Some(language) = ctx.option("language").map(str::trim).filter(|l| !l.is_empty()) {
            provider = provider.with_language(language);
        }
        if let Some(max_height) = ctx.parse_option("max_height")? {
            provider = provider.with_max_height(max_height);
        }
        Ok(provider)
    }
}

/// First element with the greatest key. `max_by` keeps the last of equal
/// elements, so walk backwards.
fn first_best<T>(items: &[T], cmp: impl Fn(&T, &T) -> Ordering) -> Option<&T> {
    items.iter().rev().max_by(|a, b| cmp(a, b))
}

impl SuggestPlaylistItemCapability for PreferredStreamProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    /// The item that is the input itself (a file opened from inside its
    /// folder), else the first item.
    fn suggest_item(&self, playlist: &Playlist) -> Option<usize> {
        let input = playlist.input();
        playlist
            .items()
            .iter()
            .position(|item| Some(item.url.as_str()) == input)
            .or_else(|| (!playlist.is_empty()).then_some(0))
    }
}

impl SuggestAudioStreamCapability for PreferredStreamProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn suggest_audio<'a>(&self, streams: &'a [AudioStream]) -> Option<&'a AudioStream> {
        let picked = first_best(streams, |a, b| {
            self.speaks(a)
                .cmp(&self.speaks(b))
                .then(a.bitrate.cmp(&b.bitrate))
                .then(a.channels.cmp(&b.channels))
        })?;
        tracing::trace!(index = picked.index, language = ?picked.language, "audio stream picked");
        Some(picked)
    }
}

impl SuggestVideoStreamCapability for PreferredStreamProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    /// Highest resolution under the cap, then fps, then bitrate. When nothing
    /// fits the cap, the smallest stream.
    fn suggest_video<'a>(&self, streams: &'a [VideoStream]) -> Option<&'a VideoStream> {
        let fitting = |a: &VideoStream, b: &VideoStream| {
            self.fits(a)
                .cmp(&self.fits(b))
                .then_with(|| match (self.fits(a), self.fits(b)) {
                    (false, false) => b.height.cmp(&a.height),
                    _ => a.height.cmp(&b.height),
                })
                .then(a.width.cmp(&b.width))
                .then(a.fps.total_cmp(&b.fps))
                .then(a.bitrate.cmp(&b.bitrate))
        };
        first_best(streams, fitting)
    }
}

impl Provider for PreferredStreamProvider {
    fn as_suggest_playlist_item(
        self: Arc<Self>,
    ) -> Option<Arc<dyn SuggestPlaylistItemCapability>> {
        Some(self)
    }

    fn as_suggest_audio_stream(self: Arc<Self>) -> Option<Arc<dyn SuggestAudioStreamCapability>> {
        Some(self)
    }

    fn as_suggest_video_stream(self: Arc<Self>) -> Option<Arc<dyn SuggestVideoStreamCapability>> {
        Some(self)
    }
}
