//! Files that sit next to a media file and share its stem, such as
//! `movie.en.srt` or `movie.commentary.ogg` beside `movie.mkv`.

use crate::scan::extension_of;
use std::fs;
use std::path::{Path, PathBuf};

pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "vtt", "ass", "ssa"];

pub fn is_subtitles(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SUBTITLE_EXTENSIONS.contains(&ext.as_str()))
}

/// `movie.en.srt` → `en`. Only two or three letter ASCII segments count.
pub fn language_hint(path: &Path) -> Option<String> {
    let stem = Path::new(path.file_stem()?);
    let hint = stem.extension()?.to_str()?;
    let is_code = (2..=3).contains(&hint.len()) && hint.chars().all(|c| c.is_ascii_alphabetic());
    is_code.then(|| hint.to_ascii_lowercase())
}

/// Siblings of `media` named `<stem>.<ext>` or `<stem>.<anything>.<ext>`,
/// sorted by file name.
pub fn find_sidecars(media: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let (Some(parent), Some(stem)) = (media.parent(), media.file_stem().and_then(|s| s.to_str()))
    else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };

    let prefix = format!("{stem}.");
    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path != media && path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .filter(|path| extension_of(path).is_some_and(|ext| extensions.contains(&ext.as_str())))
        .collect();
    found.sort();
    found
}
