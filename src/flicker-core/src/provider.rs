//! Provider and capability contracts.
//!
//! A provider is one plugin instance. It joins a dispatch chain for every
//! capability it hands out through the `as_*` accessors on [`Provider`]; the
//! handler calls each accessor once, when the provider is registered.

use crate::models::{
    AudioStream, ExternalAudioStream, ExternalVideoStream, PlaylistItem, SubtitlesStream,
    VideoStream,
};
use crate::playlist::Playlist;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Priority used by capabilities that do not override `priority()`.
pub const DEFAULT_PRIORITY: i32 = 1000;

/// Failures reported by providers. The message is surfaced to callers as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("entity not found: {entity}")]
    NotFound { entity: String },
    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
    #[error("invalid option {key}: {message}")]
    InvalidOption { key: String, message: String },
    #[error("{message}")]
    Other { message: String },
}

impl ProviderError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Opens an input into the playlist and later opens individual items of it.
pub trait OpenCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Cheap probe; must not mutate anything.
    fn can_open(&self, playlist: &Playlist) -> bool;

    /// `None` means "not applicable", `Some(Err(_))` is authoritative and ends
    /// the chain.
    fn open(&self, playlist: &mut Playlist) -> Option<ProviderResult<()>>;

    /// Opens the currently selected item. `None` is treated as cancelled.
    fn open_item(&self, playlist: &mut Playlist) -> Option<ProviderResult<()>>;
}

pub trait OpenSubtitlesCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn open_subtitles(&self, url: &str) -> Option<ProviderResult<SubtitlesStream>>;
}

pub trait ScrapeItemCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn scrape_item(&self, item: &mut PlaylistItem);
}

pub trait SuggestPlaylistItemCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Index of the item to play first.
    fn suggest_item(&self, playlist: &Playlist) -> Option<usize>;
}

pub trait SuggestAudioStreamCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn suggest_audio<'a>(&self, streams: &'a [AudioStream]) -> Option<&'a AudioStream>;
}

pub trait SuggestVideoStreamCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn suggest_video<'a>(&self, streams: &'a [VideoStream]) -> Option<&'a VideoStream>;
}

pub trait SuggestExternalAudioCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn suggest_external_audio(&self, playlist: &Playlist) -> Option<ExternalAudioStream>;
}

pub trait SuggestExternalVideoCapability: Send + Sync {
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn suggest_external_video(&self, playlist: &Playlist) -> Option<ExternalVideoStream>;
}

/// A plugin instance.
///
/// Capabilities are handed out as shared handles so the capability index can
/// keep them without borrowing the provider:
///
/// ```rust,ignore
/// impl Provider for MyOpener {
///     fn as_open(self: Arc<Self>) -> Option<Arc<dyn OpenCapability>> {
///         Some(self)
///     }
/// }
/// ```
pub trait Provider: Send + Sync {
    fn as_open(self: Arc<Self>) -> Option<Arc<dyn OpenCapability>> {
        None
    }

    fn as_open_subtitles(self: Arc<Self>) -> Option<Arc<dyn OpenSubtitlesCapability>> {
        None
    }

    fn as_scrape_item(self: Arc<Self>) -> Option<Arc<dyn ScrapeItemCapability>> {
        None
    }

    fn as_suggest_playlist_item(self: Arc<Self>) -> Option<Arc<dyn SuggestPlaylistItemCapability>> {
        None
    }

    fn as_suggest_audio_stream(self: Arc<Self>) -> Option<Arc<dyn SuggestAudioStreamCapability>> {
        None
    }

    fn as_suggest_video_stream(self: Arc<Self>) -> Option<Arc<dyn SuggestVideoStreamCapability>> {
        None
    }

    fn as_suggest_external_audio(
        self: Arc<Self>,
    ) -> Option<Arc<dyn SuggestExternalAudioCapability>> {
        None
    }

    fn as_suggest_external_video(
        self: Arc<Self>,
    ) -> Option<Arc<dyn SuggestExternalVideoCapability>> {
        None
    }

    /// A new open attempt is about to start.
    fn on_initializing(&self) {}

    /// Session state was reset for the open attempt.
    fn on_initialized(&self) {}

    /// A switch to another playlist item is about to start.
    fn on_initializing_switch(&self) {}

    fn on_initialized_switch(&self) {}

    /// Called once when the owning handler is torn down.
    fn release(&self) -> ProviderResult<()> {
        Ok(())
    }
}

/// What a factory gets to build a provider instance with.
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    pub handler_id: u64,
    pub name: String,
    pub options: BTreeMap<String, String>,
}

impl ProviderContext {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn parse_option<T>(&self, key: &str) -> ProviderResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.option(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| ProviderError::InvalidOption {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Providers that can be built straight from a [`ProviderContext`].
pub trait ConstructProvider: Provider + Sized + 'static {
    fn construct(ctx: &ProviderContext) -> ProviderResult<Self>;
}

type Factory = dyn Fn(&ProviderContext) -> ProviderResult<Arc<dyn Provider>> + Send + Sync;

/// Registration-table entry: static metadata plus how to build the instance.
#[derive(Clone)]
pub struct ProviderDescriptor {
    name: String,
    version: String,
    implementation: &'static str,
    factory: Arc<Factory>,
}

impl ProviderDescriptor {
    pub fn new<F>(name: impl Into<String>, version: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ProviderContext) -> ProviderResult<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            version: version.into(),
            implementation: "factory",
            factory: Arc::new(factory),
        }
    }

    /// Typed descriptor for a [`ConstructProvider`].
    pub fn of<P: ConstructProvider>(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            implementation: std::any::type_name::<P>(),
            factory: Arc::new(|ctx: &ProviderContext| {
                Ok(Arc::new(P::construct(ctx)?) as Arc<dyn Provider>)
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub fn construct(&self, ctx: &ProviderContext) -> ProviderResult<Arc<dyn Provider>> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("implementation", &self.implementation)
            .finish_non_exhaustive()
    }
}
