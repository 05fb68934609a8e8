//! Default output filenames.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::media::{Container, MediaFile, Track};
use crate::sanitize::{sanitize, strip_fragment};

/// Codec substring to extension, consulted in order; first match wins.
const CODEC_EXTENSIONS: &[(&[&str], &str)] = &[
    (&["SSA", "ASS"], ".ass"),
    (&["SRT", "UTF8"], ".srt"),
    (&["PGS"], ".sup"),
    (&["VOBSUB"], ".sub"),
    (&["AAC"], ".aac"),
    (&["AC3"], ".ac3"),
    (&["AVC", "H264"], ".h264"),
    (&["HEVC", "H265"], ".h265"),
];

const FALLBACK_EXTENSION: &str = ".dat";

/// Infer an extraction extension (with leading dot) from a codec identifier.
pub fn extension_for_codec(codec: &str) -> &'static str {
    let codec = codec.to_ascii_uppercase();
    CODEC_EXTENSIONS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| codec.contains(n)))
        .map(|(_, ext)| *ext)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Generate a collision-free filename for one track.
///
/// Parts are the source basename, the language (unless `und`) and the
/// track name with disallowed characters dropped (unless empty), joined with
/// `.`. A name already in `used` gets `_1`, `_2`, ... before the extension.
/// The chosen name is recorded in `used`, so callers must feed tracks in a
/// stable order with the same set.
pub fn generate(track: &Track, source_basename: &str, used: &mut HashSet<String>) -> String {
    let ext = extension_for_codec(&track.codec);

    let mut parts = vec![source_basename.to_string()];
    if !track.language.is_empty() && track.language != "und" {
        parts.push(track.language.clone());
    }
    if let Some(name) = track.name.as_deref().and_then(strip_fragment) {
        parts.push(name);
    }

    let base = sanitize(&parts.join("."));
    let mut candidate = format!("{base}{ext}");
    let mut counter = 1;
    while used.contains(&candidate) {
        candidate = format!("{base}_{counter}{ext}");
        counter += 1;
    }

    used.insert(candidate.clone());
    candidate
}

/// Generate names for every track of `media` in ascending id order.
pub fn generate_all(media: &MediaFile) -> Vec<(u32, String)> {
    let stem = media.stem();
    let mut tracks: Vec<&Track> = media.tracks.iter().collect();
    tracks.sort_by_key(|t| t.id);

    let mut used = HashSet::new();
    tracks
        .into_iter()
        .map(|t| (t.id, generate(t, &stem, &mut used)))
        .collect()
}

/// Default output path for a container-producing operation:
/// `<dir>/<stem><suffix>.<ext>` next to the source.
pub fn default_output_path(source: &Path, suffix: &str, container: Container) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = sanitize(&format!("{stem}{suffix}.{}", container.extension()));
    match source.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
