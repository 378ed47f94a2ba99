//! Provider loading and the per-capability index.

use crate::error::LoadError;
use flicker_core::{
    OpenCapability, OpenSubtitlesCapability, PluginsConfig, Provider, ProviderContext,
    ProviderDescriptor, ScrapeItemCapability, SuggestAudioStreamCapability,
    SuggestExternalAudioCapability, SuggestExternalVideoCapability,
    SuggestPlaylistItemCapability, SuggestVideoStreamCapability,
};
use std::fmt;
use std::sync::Arc;

/// The fixed set of optional capabilities a provider may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
    Open,
    OpenSubtitles,
    ScrapeItem,
    SuggestPlaylistItem,
    SuggestAudioStream,
    SuggestVideoStream,
    SuggestExternalAudio,
    SuggestExternalVideo,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 8] = [
        CapabilityKind::Open,
        CapabilityKind::OpenSubtitles,
        CapabilityKind::ScrapeItem,
        CapabilityKind::SuggestPlaylistItem,
        CapabilityKind::SuggestAudioStream,
        CapabilityKind::SuggestVideoStream,
        CapabilityKind::SuggestExternalAudio,
        CapabilityKind::SuggestExternalVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Open => "open",
            CapabilityKind::OpenSubtitles => "open-subtitles",
            CapabilityKind::ScrapeItem => "scrape-item",
            CapabilityKind::SuggestPlaylistItem => "suggest-playlist-item",
            CapabilityKind::SuggestAudioStream => "suggest-audio-stream",
            CapabilityKind::SuggestVideoStream => "suggest-video-stream",
            CapabilityKind::SuggestExternalAudio => "suggest-external-audio",
            CapabilityKind::SuggestExternalVideo => "suggest-external-video",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability flags resolved for one provider at registration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityFlags {
    pub open: bool,
    pub open_subtitles: bool,
    pub scrape_item: bool,
    pub suggest_playlist_item: bool,
    pub suggest_audio_stream: bool,
    pub suggest_video_stream: bool,
    pub suggest_external_audio: bool,
    pub suggest_external_video: bool,
}

impl CapabilityFlags {
    pub fn contains(&self, kind: CapabilityKind) -> bool {
        match kind {
            CapabilityKind::Open => self.open,
            CapabilityKind::OpenSubtitles => self.open_subtitles,
            CapabilityKind::ScrapeItem => self.scrape_item,
            CapabilityKind::SuggestPlaylistItem => self.suggest_playlist_item,
            CapabilityKind::SuggestAudioStream => self.suggest_audio_stream,
            CapabilityKind::SuggestVideoStream => self.suggest_video_stream,
            CapabilityKind::SuggestExternalAudio => self.suggest_external_audio,
            CapabilityKind::SuggestExternalVideo => self.suggest_external_video,
        }
    }

    pub fn kinds(&self) -> Vec<CapabilityKind> {
        CapabilityKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }
}

/// One provider's handle for one capability, with the priority it reported.
pub struct Capable<C: ?Sized> {
    name: Arc<str>,
    priority: i32,
    handle: Arc<C>,
}

impl<C: ?Sized> Capable<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn handle(&self) -> &C {
        &self.handle
    }
}

impl<C: ?Sized> Clone for Capable<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            priority: self.priority,
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<C: ?Sized> fmt::Debug for Capable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capable")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Providers of one capability, ascending by priority, ties in registration order.
pub struct CapabilitySet<C: ?Sized> {
    kind: CapabilityKind,
    entries: Vec<Capable<C>>,
}

impl<C: ?Sized> CapabilitySet<C> {
    fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Keyed by name: a second entry with the same name replaces the first in place.
    fn insert(&mut self, name: &Arc<str>, priority: i32, handle: Arc<C>) {
        let entry = Capable {
            name: Arc::clone(name),
            priority,
            handle,
        };
        match self.entries.iter_mut().find(|e| e.name == *name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.entries.sort_by_key(|e| e.priority);
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Capable<C>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Capable<C>> {
        self.entries.iter().find(|e| &*e.name == name)
    }

    /// Provider names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }
}

impl<'a, C: ?Sized> IntoIterator for &'a CapabilitySet<C> {
    type Item = &'a Capable<C>;
    type IntoIter = std::slice::Iter<'a, Capable<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Capability kind → ordered provider set. Immutable once built.
pub struct CapabilityIndex {
    open: CapabilitySet<dyn OpenCapability>,
    open_subtitles: CapabilitySet<dyn OpenSubtitlesCapability>,
    scrape_item: CapabilitySet<dyn ScrapeItemCapability>,
    suggest_playlist_item: CapabilitySet<dyn SuggestPlaylistItemCapability>,
    suggest_audio_stream: CapabilitySet<dyn SuggestAudioStreamCapability>,
    suggest_video_stream: CapabilitySet<dyn SuggestVideoStreamCapability>,
    suggest_external_audio: CapabilitySet<dyn SuggestExternalAudioCapability>,
    suggest_external_video: CapabilitySet<dyn SuggestExternalVideoCapability>,
}

impl Default for CapabilityIndex {
    fn default() -> Self {
        Self {
            open: CapabilitySet::new(CapabilityKind::Open),
            open_subtitles: CapabilitySet::new(CapabilityKind::OpenSubtitles),
            scrape_item: CapabilitySet::new(CapabilityKind::ScrapeItem),
            suggest_playlist_item: CapabilitySet::new(CapabilityKind::SuggestPlaylistItem),
            suggest_audio_stream: CapabilitySet::new(CapabilityKind::SuggestAudioStream),
            suggest_video_stream: CapabilitySet::new(CapabilityKind::SuggestVideoStream),
            suggest_external_audio: CapabilitySet::new(CapabilityKind::SuggestExternalAudio),
            suggest_external_video: CapabilitySet::new(CapabilityKind::SuggestExternalVideo),
        }
    }
}

impl CapabilityIndex {
    /// Resolves every capability accessor of `provider` once and files the
    /// handles under their kinds. Open wins over OpenSubtitles.
    fn add(&mut self, name: &Arc<str>, provider: &Arc<dyn Provider>) -> CapabilityFlags {
        let mut flags = CapabilityFlags::default();

        if let Some(open) = Arc::clone(provider).as_open() {
            flags.open = true;
            self.open.insert(name, open.priority(), open);
        } else if let Some(subtitles) = Arc::clone(provider).as_open_subtitles() {
            flags.open_subtitles = true;
            self.open_subtitles
                .insert(name, subtitles.priority(), subtitles);
        }

        if let Some(scrape) = Arc::clone(provider).as_scrape_item() {
            flags.scrape_item = true;
            self.scrape_item.insert(name, scrape.priority(), scrape);
        }

        if let Some(suggest) = Arc::clone(provider).as_suggest_playlist_item() {
            flags.suggest_playlist_item = true;
            self.suggest_playlist_item
                .insert(name, suggest.priority(), suggest);
        }

        if let Some(suggest) = Arc::clone(provider).as_suggest_audio_stream() {
            flags.suggest_audio_stream = true;
            self.suggest_audio_stream
                .insert(name, suggest.priority(), suggest);
        }

        if let Some(suggest) = Arc::clone(provider).as_suggest_video_stream() {
            flags.suggest_video_stream = true;
            self.suggest_video_stream
                .insert(name, suggest.priority(), suggest);
        }

        if let Some(suggest) = Arc::clone(provider).as_suggest_external_audio() {
            flags.suggest_external_audio = true;
            self.suggest_external_audio
                .insert(name, suggest.priority(), suggest);
        }

        if let Some(suggest) = Arc::clone(provider).as_suggest_external_video() {
            flags.suggest_external_video = true;
            self.suggest_external_video
                .insert(name, suggest.priority(), suggest);
        }

        flags
    }

    pub fn open(&self) -> &CapabilitySet<dyn OpenCapability> {
        &self.open
    }

    pub fn open_subtitles(&self) -> &CapabilitySet<dyn OpenSubtitlesCapability> {
        &self.open_subtitles
    }

    pub fn scrape_item(&self) -> &CapabilitySet<dyn ScrapeItemCapability> {
        &self.scrape_item
    }

    pub fn suggest_playlist_item(&self) -> &CapabilitySet<dyn SuggestPlaylistItemCapability> {
        &self.suggest_playlist_item
    }

    pub fn suggest_audio_stream(&self) -> &CapabilitySet<dyn SuggestAudioStreamCapability> {
        &self.suggest_audio_stream
    }

    pub fn suggest_video_stream(&self) -> &CapabilitySet<dyn SuggestVideoStreamCapability> {
        &self.suggest_video_stream
    }

    pub fn suggest_external_audio(&self) -> &CapabilitySet<dyn SuggestExternalAudioCapability> {
        &self.suggest_external_audio
    }

    pub fn suggest_external_video(&self) -> &CapabilitySet<dyn SuggestExternalVideoCapability> {
        &self.suggest_external_video
    }

    /// Provider names in dispatch order for `kind`.
    pub fn names(&self, kind: CapabilityKind) -> Vec<&str> {
        match kind {
            CapabilityKind::Open => self.open.names(),
            CapabilityKind::OpenSubtitles => self.open_subtitles.names(),
            CapabilityKind::ScrapeItem => self.scrape_item.names(),
            CapabilityKind::SuggestPlaylistItem => self.suggest_playlist_item.names(),
            CapabilityKind::SuggestAudioStream => self.suggest_audio_stream.names(),
            CapabilityKind::SuggestVideoStream => self.suggest_video_stream.names(),
            CapabilityKind::SuggestExternalAudio => self.suggest_external_audio.names(),
            CapabilityKind::SuggestExternalVideo => self.suggest_external_video.names(),
        }
    }
}

/// A constructed provider instance and what it was registered for.
pub struct LoadedProvider {
    name: Arc<str>,
    version: String,
    implementation: &'static str,
    capabilities: CapabilityFlags,
    instance: Arc<dyn Provider>,
}

impl LoadedProvider {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    pub fn instance(&self) -> &dyn Provider {
        self.instance.as_ref()
    }
}

impl fmt::Debug for LoadedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedProvider")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("implementation", &self.implementation)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Descriptors that were not loaded, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub skipped: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Loaded providers in registration order plus their capability index.
pub struct ProviderRegistry {
    providers: Vec<LoadedProvider>,
    index: CapabilityIndex,
    report: LoadReport,
}

impl ProviderRegistry {
    /// Constructs one instance per descriptor and indexes it.
    ///
    /// Nothing here is fatal: disabled, duplicate and failing descriptors are
    /// logged, recorded in the [`LoadReport`] and skipped.
    pub fn load(descriptors: &[ProviderDescriptor], config: &PluginsConfig, handler_id: u64) -> Self {
        let mut providers: Vec<LoadedProvider> = Vec::with_capacity(descriptors.len());
        let mut index = CapabilityIndex::default();
        let mut report = LoadReport::default();

        for descriptor in descriptors {
            let name = descriptor.name();
            if config.is_disabled(name) {
                tracing::info!(handler = handler_id, provider = name, "provider disabled");
                report.skipped.push(LoadError::Disabled { name: name.into() });
                continue;
            }

            if providers.iter().any(|p| p.name() == name) {
                let err = LoadError::DuplicateName { name: name.into() };
                tracing::error!(handler = handler_id, provider = name, error = %err, "rejected provider");
                report.skipped.push(err);
                continue;
            }

            let ctx = ProviderContext {
                handler_id,
                name: name.to_string(),
                options: config.options_for(name),
            };
            let instance = match descriptor.construct(&ctx) {
                Ok(instance) => instance,
                Err(source) => {
                    let err = LoadError::Construct {
                        name: name.into(),
                        source,
                    };
                    tracing::error!(handler = handler_id, provider = name, error = %err, "failed to load provider");
                    report.skipped.push(err);
                    continue;
                }
            };

            let name: Arc<str> = Arc::from(name);
            let capabilities = index.add(&name, &instance);
            tracing::debug!(
                handler = handler_id,
                provider = %name,
                version = descriptor.version(),
                capabilities = ?capabilities.kinds(),
                "provider loaded"
            );
            providers.push(LoadedProvider {
                name,
                version: descriptor.version().to_string(),
                implementation: descriptor.implementation(),
                capabilities,
                instance,
            });
        }

        Self {
            providers,
            index,
            report,
        }
    }

    pub fn providers(&self) -> &[LoadedProvider] {
        &self.providers
    }

    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
