use flicker_core::provider::{ProviderError, ProviderResult};
use flicker_core::PlaylistItem;
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "flac", "wav", "ogg", "opus", "aac"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "m4v", "webm", "avi", "mov", "ts"];

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub max_depth: usize,
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 8,
            follow_links: false,
        }
    }
}

/// Turns a playlist input into a local path, if it names one that exists.
pub fn local_path(input: &str) -> Option<PathBuf> {
    let raw = input.strip_prefix("file://").unwrap_or(input);
    if raw.is_empty() || raw.contains("://") {
        return None;
    }
    let path = PathBuf::from(raw).clean();
    path.exists().then_some(path)
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

pub fn is_audio(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_video(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_media(path: &Path) -> bool {
    is_audio(path) || is_video(path)
}

fn canonicalize_within_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let Ok(canon) = path.canonicalize() else {
        return None;
    };
    let cleaned = canon.clean();
    if cleaned.starts_with(root) {
        Some(cleaned)
    } else {
        None
    }
}

/// Media files under `input`: the file itself, or a sorted walk of the directory.
pub fn scan_input(input: &Path, options: ScanOptions) -> ProviderResult<Vec<PathBuf>> {
    let root = input
        .canonicalize()
        .map_err(|e| ProviderError::Other {
            message: format!("{}: {e}", input.display()),
        })?
        .clean();

    if root.is_file() {
        return Ok(if is_media(&root) { vec![root] } else { Vec::new() });
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(options.follow_links)
        .max_depth(options.max_depth)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| ProviderError::Other {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !is_media(entry.path()) {
            continue;
        }
        if let Some(path) = canonicalize_within_root(entry.path(), &root) {
            found.push(path);
        }
    }
    Ok(found)
}

/// Builds the playlist entry for `path`, inferring artist and album from the
/// directories between `root` and the file.
pub fn item_for(path: &Path, root: &Path) -> PlaylistItem {
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown");
    let mut item = PlaylistItem::new(path.to_string_lossy(), title);

    let mut folders: Vec<String> = path
        .strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .map(|rel| {
            rel.components()
                .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if is_audio(path) {
        if folders.len() >= 2 {
            item.album = folders.pop();
            item.artist = folders.pop();
        } else {
            item.artist = folders.pop();
        }
    }

    item.tags.insert("opener".into(), "filesystem".into());
    if let Some(ext) = extension_of(path) {
        item.tags.insert("container".into(), ext);
    }
    item
}
