//! Local filesystem providers: an opener for files and folders that also
//! scrapes tags and finds sidecar audio, and a sidecar subtitles opener.

mod scan;
mod sidecar;
mod tags;

use flicker_core::provider::{ProviderError, ProviderResult};
use flicker_core::{
    ConstructProvider, ExternalAudioStream, OpenCapability, OpenSubtitlesCapability, Playlist,
    PlaylistItem, Provider, ProviderContext, ProviderDescriptor, ScrapeItemCapability,
    SubtitlesStream, SuggestExternalAudioCapability, DEFAULT_PRIORITY,
};
use scan::ScanOptions;
use std::path::Path;
use std::sync::Arc;

pub use scan::{AUDIO_EXTENSIONS, VIDEO_EXTENSIONS};
pub use sidecar::SUBTITLE_EXTENSIONS;

pub const FILESYSTEM_PROVIDER: &str = "filesystem";
pub const SIDECAR_SUBTITLES_PROVIDER: &str = "sidecar-subtitles";

pub fn descriptor() -> ProviderDescriptor {
    ProviderDescriptor::of::<FilesystemProvider>(FILESYSTEM_PROVIDER, env!("CARGO_PKG_VERSION"))
}

pub fn subtitles_descriptor() -> ProviderDescriptor {
    ProviderDescriptor::of::<SidecarSubtitlesProvider>(
        SIDECAR_SUBTITLES_PROVIDER,
        env!("CARGO_PKG_VERSION"),
    )
}

/// Opens local media files and directories.
///
/// Options: `priority`, `max_depth`, `follow_links`.
#[derive(Debug, Clone)]
pub struct FilesystemProvider {
    priority: i32,
    scan: ScanOptions,
}

impl FilesystemProvider {
    pub fn new() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            scan: ScanOptions::default(),
        }
    }
}

impl Default for FilesystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructProvider for FilesystemProvider {
    fn construct(ctx: &ProviderContext) -> ProviderResult<Self> {
        let defaults = Self::new();
        Ok(Self {
            priority: ctx.parse_option("priority")?.unwrap_or(defaults.priority),
            scan: ScanOptions {
                max_depth: ctx
                    .parse_option("max_depth")?
                    .unwrap_or(defaults.scan.max_depth),
                follow_links: ctx
                    .parse_option("follow_links")?
                    .unwrap_or(defaults.scan.follow_links),
            },
        })
    }
}

impl OpenCapability for FilesystemProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_open(&self, playlist: &Playlist) -> bool {
        playlist
            .input()
            .and_then(scan::local_path)
            .is_some_and(|path| path.is_dir() || scan::is_media(&path))
    }

    fn open(&self, playlist: &mut Playlist) -> Option<ProviderResult<()>> {
        let input = playlist.input()?.to_string();
        let path = scan::local_path(&input)?;

        let found = match scan::scan_input(&path, self.scan) {
            Ok(found) => found,
            Err(err) => return Some(Err(err)),
        };
        if found.is_empty() {
            return Some(Err(ProviderError::NotFound {
                entity: format!("media files in {input}"),
            }));
        }

        let root = match path.canonicalize() {
            Ok(canon) if canon.is_dir() => canon,
            _ => found
                .first()
                .and_then(|file| file.parent())
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        for file in &found {
            playlist.add_item(scan::item_for(file, &root));
        }
        playlist.set_expecting_items(found.len());
        tracing::debug!(input = %input, items = found.len(), "scanned local input");
        Some(Ok(()))
    }

    fn open_item(&self, playlist: &mut Playlist) -> Option<ProviderResult<()>> {
        let Some(item) = playlist.selected() else {
            return Some(Err(ProviderError::other("no playlist item selected")));
        };
        if !Path::new(&item.url).is_file() {
            return Some(Err(ProviderError::NotFound {
                entity: item.url.clone(),
            }));
        }
        Some(Ok(()))
    }
}

impl ScrapeItemCapability for FilesystemProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn scrape_item(&self, item: &mut PlaylistItem) {
        let path = Path::new(&item.url);
        if !scan::is_audio(path) || !path.is_file() {
            return;
        }
        tags::parse_tags(path).apply_to(item);
    }
}

impl SuggestExternalAudioCapability for FilesystemProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn suggest_external_audio(&self, playlist: &Playlist) -> Option<ExternalAudioStream> {
        let item = playlist.selected()?;
        let media = Path::new(&item.url);
        if !scan::is_video(media) {
            return None;
        }

        let sidecar = sidecar::find_sidecars(media, AUDIO_EXTENSIONS)
            .into_iter()
            .next()?;
        Some(ExternalAudioStream {
            url: sidecar.to_string_lossy().to_string(),
            codec: scan::extension_of(&sidecar),
            language: sidecar::language_hint(&sidecar),
            sample_rate: tags::parse_tags(&sidecar).sample_rate,
        })
    }
}

impl Provider for FilesystemProvider {
    fn as_open(self: Arc<Self>) -> Option<Arc<dyn OpenCapability>> {
        Some(self)
    }

    fn as_scrape_item(self: Arc<Self>) -> Option<Arc<dyn ScrapeItemCapability>> {
        Some(self)
    }

    fn as_suggest_external_audio(
        self: Arc<Self>,
    ) -> Option<Arc<dyn SuggestExternalAudioCapability>> {
        Some(self)
    }
}

/// Opens `.srt`, `.vtt`, `.ass` and `.ssa` files from local paths.
#[derive(Debug, Clone)]
pub struct SidecarSubtitlesProvider {
    priority: i32,
}

impl Default for SidecarSubtitlesProvider {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl ConstructProvider for SidecarSubtitlesProvider {
    fn construct(ctx: &ProviderContext) -> ProviderResult<Self> {
        Ok(Self {
            priority: ctx.parse_option("priority")?.unwrap_or(DEFAULT_PRIORITY),
        })
    }
}

impl OpenSubtitlesCapability for SidecarSubtitlesProvider {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn open_subtitles(&self, url: &str) -> Option<ProviderResult<SubtitlesStream>> {
        let raw = url.strip_prefix("file://").unwrap_or(url);
        if raw.contains("://") || !sidecar::is_subtitles(Path::new(raw)) {
            return None;
        }
        let Some(path) = scan::local_path(raw) else {
            return Some(Err(ProviderError::NotFound {
                entity: url.to_string(),
            }));
        };

        Some(Ok(SubtitlesStream {
            url: path.to_string_lossy().to_string(),
            format: scan::extension_of(&path).unwrap_or_default(),
            language: sidecar::language_hint(&path),
        }))
    }
}

impl Provider for SidecarSubtitlesProvider {
    fn as_open_subtitles(self: Arc<Self>) -> Option<Arc<dyn OpenSubtitlesCapability>> {
        Some(self)
    }
}
