use flicker_core::PlaylistItem;
use lofty::{Accessor, AudioFile, ItemKey, Probe, TaggedFileExt};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ParsedTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<u32>,
    pub track_number: Option<u32>,
    pub sample_rate: Option<u32>,
}

/// Reads whatever lofty understands; unreadable files give empty tags.
pub fn parse_tags(path: &Path) -> ParsedTags {
    let tagged = match Probe::open(path).and_then(|p| p.read()) {
        Ok(tagged) => tagged,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "no readable tags");
            return ParsedTags::default();
        }
    };

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
    let properties = tagged.properties();

    let title = tag.and_then(|t| t.get_string(&ItemKey::TrackTitle).map(|s| s.to_string()));
    let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));
    let album = tag.and_then(|t| t.album().map(|s| s.to_string()));
    let duration_seconds = Some(properties.duration().as_secs() as u32).filter(|d| *d > 0);
    let track_number = tag.and_then(|t| t.track());

    ParsedTags {
        title,
        artist,
        album,
        duration_seconds,
        track_number,
        sample_rate: properties.sample_rate(),
    }
}

impl ParsedTags {
    /// Tag values win over what the opener inferred from the path.
    pub fn apply_to(self, item: &mut PlaylistItem) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if self.artist.is_some() {
            item.artist = self.artist;
        }
        if self.album.is_some() {
            item.album = self.album;
        }
        if self.duration_seconds.is_some() {
            item.duration_seconds = self.duration_seconds;
        }
        if let Some(track) = self.track_number {
            item.tags.insert("track_number".into(), track.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_override_inferred_fields() {
        let mut item = PlaylistItem::new("/music/a/b/song.flac", "song");
        item.artist = Some("a".into());
        item.album = Some("b".into());

        ParsedTags {
            title: Some("Song".into()),
            artist: Some("Real Artist".into()),
            track_number: Some(3),
            ..Default::default()
        }
        .apply_to(&mut item);

        assert_eq!(item.title, "Song");
        assert_eq!(item.artist.as_deref(), Some("Real Artist"));
        assert_eq!(item.album.as_deref(), Some("b"));
        assert_eq!(item.tags["track_number"], "3");
    }

    #[test]
    fn garbage_files_have_no_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.mp3");
        std::fs::write(&path, b"not really audio").unwrap();

        let tags = parse_tags(&path);
        assert!(tags.title.is_none());
        assert!(tags.duration_seconds.is_none());
    }
}
