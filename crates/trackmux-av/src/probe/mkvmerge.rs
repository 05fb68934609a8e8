//! mkvmerge-based [`Prober`] for matroska files.
//!
//! Shells out to `mkvmerge -J <file>` and maps the JSON identification
//! output into a [`MediaFile`]. Track ids are the container's own track
//! numbers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use trackmux_core::{Error, MediaFile, ProbeDialect, Result, Track, TrackType};

use super::{run_prober, Prober};
use crate::command::path_arg;

/// A prober backed by the `mkvmerge` CLI.
#[derive(Debug, Clone)]
pub struct MkvmergeProber {
    mkvmerge_path: PathBuf,
}

impl MkvmergeProber {
    pub fn new(mkvmerge_path: impl Into<PathBuf>) -> Self {
        Self {
            mkvmerge_path: mkvmerge_path.into(),
        }
    }
}

impl Prober for MkvmergeProber {
    fn name(&self) -> &'static str {
        "mkvmerge"
    }

    fn dialect(&self) -> ProbeDialect {
        ProbeDialect::Matroska
    }

    fn probe(&self, path: &Path) -> Result<MediaFile> {
        let stdout = run_prober(
            self.name(),
            &self.mkvmerge_path,
            &["-J".to_string(), path_arg(path)],
            identification_errors,
        )?;
        parse_mkvmerge_output(path, &stdout)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MkvmergeOutput {
    #[serde(default)]
    tracks: Vec<MkvmergeTrack>,
    #[serde(default)]
    container: Option<MkvmergeContainer>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeTrack {
    id: u32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: MkvmergeTrackProperties,
}

#[derive(Debug, Default, Deserialize)]
struct MkvmergeTrackProperties {
    codec_id: Option<String>,
    language: Option<String>,
    track_name: Option<String>,
    #[serde(default)]
    default_track: bool,
    #[serde(default)]
    forced_track: bool,
}

#[derive(Debug, Deserialize)]
struct MkvmergeContainer {
    #[serde(default)]
    properties: MkvmergeContainerProperties,
}

#[derive(Debug, Default, Deserialize)]
struct MkvmergeContainerProperties {
    /// Nanoseconds.
    duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct MkvmergeErrors {
    #[serde(default)]
    errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Normalize `mkvmerge -J` output. Tracks of unknown type are dropped.
pub fn parse_mkvmerge_output(path: &Path, json: &str) -> Result<MediaFile> {
    let output: MkvmergeOutput = serde_json::from_str(json)
        .map_err(|e| Error::parse_failed("mkvmerge", format!("invalid JSON: {e}")))?;

    let mut tracks = Vec::with_capacity(output.tracks.len());
    for t in output.tracks {
        let Some(kind) = TrackType::from_probe_label(&t.kind) else {
            tracing::warn!(id = t.id, kind = %t.kind, "dropping track of unsupported type");
            continue;
        };

        let codec = t
            .properties
            .codec_id
            .filter(|c| !c.is_empty())
            .unwrap_or(t.codec);
        let language = t
            .properties
            .language
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "und".to_string());

        tracks.push(Track {
            id: t.id,
            kind,
            codec,
            language,
            name: t.properties.track_name.filter(|n| !n.is_empty()),
            default_track: t.properties.default_track,
            forced_track: t.properties.forced_track,
        });
    }

    let duration = output
        .container
        .and_then(|c| c.properties.duration)
        .map(Duration::from_nanos);

    Ok(MediaFile {
        path: path.to_path_buf(),
        dialect: ProbeDialect::Matroska,
        tracks,
        duration,
    })
}

/// mkvmerge reports identification failures inside its JSON on stdout.
fn identification_errors(stdout: &str) -> Option<String> {
    let parsed: MkvmergeErrors = serde_json::from_str(stdout).ok()?;
    if parsed.errors.is_empty() {
        None
    } else {
        Some(parsed.errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = r#"{
        "container": {"properties": {"duration": 5025000000000}, "recognized": true, "type": "Matroska"},
        "tracks": [
            {"id": 0, "type": "video", "codec": "AVC/H.264/MPEG-4p10",
             "properties": {"codec_id": "V_MPEG4/ISO/AVC", "language": "und", "default_track": true}},
            {"id": 1, "type": "audio", "codec": "AC-3",
             "properties": {"codec_id": "A_AC3", "language": "eng", "track_name": "Surround 5.1"}},
            {"id": 2, "type": "subtitles", "codec": "SubRip/SRT",
             "properties": {"codec_id": "S_TEXT/UTF8", "language": "spa", "forced_track": true}},
            {"id": 3, "type": "buttons", "codec": "HDMV/IG", "properties": {}}
        ],
        "attachments": []
    }"#;

    #[test]
    fn normalizes_tracks() {
        let media = parse_mkvmerge_output(Path::new("/m/movie.mkv"), SAMPLE).unwrap();
        assert_eq!(media.dialect, ProbeDialect::Matroska);
        assert_eq!(media.tracks.len(), 3);

        let sub = media.track(2).unwrap();
        assert_eq!(sub.kind, TrackType::Subtitle);
        assert_eq!(sub.codec, "S_TEXT/UTF8");
        assert_eq!(sub.language, "spa");
        assert!(sub.forced_track);
        assert!(sub.name.is_none());

        let audio = media.track(1).unwrap();
        assert_eq!(audio.name.as_deref(), Some("Surround 5.1"));
        assert!(media.track(0).unwrap().default_track);
    }

    #[test]
    fn duration_from_nanoseconds() {
        let media = parse_mkvmerge_output(Path::new("/m/movie.mkv"), SAMPLE).unwrap();
        assert_eq!(media.duration, Some(Duration::from_secs(5025)));
    }

    #[test]
    fn missing_fields_default() {
        let json = r#"{"tracks": [{"id": 7, "type": "audio", "codec": "FLAC"}]}"#;
        let media = parse_mkvmerge_output(Path::new("a.mka"), json).unwrap();
        let t = media.track(7).unwrap();
        assert_eq!(t.language, "und");
        assert_eq!(t.codec, "FLAC");
        assert!(t.name.is_none());
        assert!(media.duration.is_none());
    }

    #[test]
    fn invalid_json() {
        let err = parse_mkvmerge_output(Path::new("a.mkv"), "not json").unwrap_err();
        assert_matches!(err, Error::ParseFailed { ref tool, .. } if tool == "mkvmerge");
    }

    #[test]
    fn identification_errors_are_extracted() {
        let json = r#"{"errors": ["The file could not be opened."], "tracks": []}"#;
        assert_eq!(
            identification_errors(json).as_deref(),
            Some("The file could not be opened.")
        );
        assert!(identification_errors(SAMPLE).is_none());
        assert!(identification_errors("garbage").is_none());
    }
}
