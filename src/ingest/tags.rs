use std::fs::File;
use std::path::Path;

use symphonia::core::{
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::{MetadataOptions, MetadataRevision, StandardTagKey},
    probe::Hint,
};
use tracing::debug;

/// Title/artist/album pulled from a file's embedded tags, with every
/// missing field already replaced by its fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackTags {
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) album: String,
}

/// Read embedded tags, falling back to the filename for the title and
/// `"Unknown"` for everything else. Never fails: a file that cannot even be
/// probed still gets usable metadata.
pub(crate) fn read_tags(path: &Path) -> TrackTags {
    let mut fields = TagFields::default();
    if let Err(reason) = probe_tags(path, &mut fields) {
        debug!(path = %path.display(), reason, "Tag probe failed, using fallbacks");
    }
    fields.finish(path)
}

#[derive(Default)]
struct TagFields {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    album_artist: Option<String>,
}

impl TagFields {
    fn absorb(&mut self, revision: &MetadataRevision) {
        for tag in revision.tags() {
            let value = tag.value.to_string();
            if value.trim().is_empty() {
                continue;
            }
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) => fill(&mut self.title, value),
                Some(StandardTagKey::Artist) => fill(&mut self.artist, value),
                Some(StandardTagKey::Album) => fill(&mut self.album, value),
                Some(StandardTagKey::AlbumArtist) => fill(&mut self.album_artist, value),
                _ => {}
            }
        }
    }

    fn finish(self, path: &Path) -> TrackTags {
        // An album-artist tag wins over the per-track artist when present.
        let artist = self.album_artist.or(self.artist);
        let title = self.title.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        TrackTags {
            title: or_unknown(title),
            artist: or_unknown(artist.unwrap_or_default()),
            album: or_unknown(self.album.unwrap_or_default()),
        }
    }
}

fn fill(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn or_unknown(value: String) -> String {
    if value.trim().is_empty() {
        "Unknown".to_string()
    } else {
        value
    }
}

fn probe_tags(path: &Path, fields: &mut TagFields) -> Result<(), String> {
    let file = File::open(path).map_err(|err| err.to_string())?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }
    let mut probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| err.to_string())?;

    if let Some(metadata) = probed.metadata.get()
        && let Some(revision) = metadata.current()
    {
        fields.absorb(revision);
    }
    if let Some(revision) = probed.format.metadata().current() {
        fields.absorb(revision);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::tempdir;

    #[test]
    fn untagged_wav_falls_back_to_the_filename_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Morning Dew.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..2_205 {
            writer.write_sample(0.1_f32).unwrap();
        }
        writer.finalize().unwrap();

        let tags = read_tags(&path);
        assert_eq!(tags.title, "Morning Dew");
        assert_eq!(tags.artist, "Unknown");
        assert_eq!(tags.album, "Unknown");
    }

    #[test]
    fn unreadable_file_still_produces_fallback_tags() {
        let tags = read_tags(Path::new("/nonexistent/Track Nine.mp3"));
        assert_eq!(tags.title, "Track Nine");
        assert_eq!(tags.artist, "Unknown");
        assert_eq!(tags.album, "Unknown");
    }

    #[test]
    fn album_artist_outranks_track_artist() {
        let mut fields = TagFields {
            title: Some("T".into()),
            artist: Some("Track Artist".into()),
            album: Some("A".into()),
            album_artist: Some("Band".into()),
        };
        fill(&mut fields.artist, "ignored".into());
        let tags = fields.finish(Path::new("x.mp3"));
        assert_eq!(tags.artist, "Band");
    }
}
