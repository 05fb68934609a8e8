//! FFprobe-based [`Prober`] for everything that is not matroska.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`.
//! Track ids are 0-based stream indexes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use trackmux_core::{Error, MediaFile, ProbeDialect, Result, Track, TrackType};

use super::{run_prober, Prober};
use crate::command::path_arg;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn dialect(&self) -> ProbeDialect {
        ProbeDialect::Generic
    }

    fn probe(&self, path: &Path) -> Result<MediaFile> {
        let mut args: Vec<String> = [
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(path_arg(path));

        let stdout = run_prober(self.name(), &self.ffprobe_path, &args, |_| None)?;
        parse_ffprobe_output(path, &stdout)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    #[serde(alias = "LANGUAGE")]
    language: Option<String>,
    #[serde(alias = "TITLE")]
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Normalize ffprobe JSON. Streams other than video, audio and subtitle
/// are dropped.
pub fn parse_ffprobe_output(path: &Path, json: &str) -> Result<MediaFile> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| Error::parse_failed("ffprobe", format!("invalid JSON: {e}")))?;

    let mut tracks = Vec::with_capacity(output.streams.len());
    for s in output.streams {
        let label = s.codec_type.as_deref().unwrap_or("");
        let Some(kind) = TrackType::from_probe_label(label) else {
            tracing::warn!(index = s.index, codec_type = %label, "dropping unsupported stream");
            continue;
        };

        tracks.push(Track {
            id: s.index,
            kind,
            codec: s.codec_name.unwrap_or_default(),
            language: s
                .tags
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "und".to_string()),
            name: Some(
                s.tags
                    .title
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            default_track: s.disposition.default == 1,
            forced_track: s.disposition.forced == 1,
        });
    }

    let duration = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    Ok(MediaFile {
        path: path.to_path_buf(),
        dialect: ProbeDialect::Generic,
        tracks,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264",
             "disposition": {"default": 1, "forced": 0}, "tags": {"language": "und"}},
            {"index": 1, "codec_type": "audio", "codec_name": "aac",
             "disposition": {"default": 1, "forced": 0}, "tags": {"language": "eng", "title": "Stereo"}},
            {"index": 2, "codec_type": "data", "codec_name": "bin_data"},
            {"index": 3, "codec_type": "subtitle", "codec_name": "mov_text",
             "disposition": {"default": 0, "forced": 1}, "tags": {"language": "por"}}
        ],
        "format": {"filename": "movie.mp4", "duration": "125.480000"}
    }"#;

    #[test]
    fn normalizes_streams() {
        let media = parse_ffprobe_output(Path::new("/m/movie.mp4"), SAMPLE).unwrap();
        assert_eq!(media.dialect, ProbeDialect::Generic);
        let ids: Vec<u32> = media.tracks.iter().map(|t| t.id).collect();
        assert_eq!(ids, [0, 1, 3]);

        let sub = media.track(3).unwrap();
        assert_eq!(sub.kind, TrackType::Subtitle);
        assert_eq!(sub.codec, "mov_text");
        assert_eq!(sub.language, "por");
        assert_eq!(sub.name.as_deref(), Some("Unknown"));
        assert!(sub.forced_track);

        let audio = media.track(1).unwrap();
        assert_eq!(audio.name.as_deref(), Some("Stereo"));
        assert!(audio.default_track);
    }

    #[test]
    fn duration_from_seconds_string() {
        let media = parse_ffprobe_output(Path::new("/m/movie.mp4"), SAMPLE).unwrap();
        let secs = media.duration.map(|d| d.as_secs_f64()).unwrap_or_default();
        assert!((secs - 125.48).abs() < 1e-6, "{secs}");
    }

    #[test]
    fn missing_tags_default() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "audio"}]}"#;
        let media = parse_ffprobe_output(Path::new("a.wav"), json).unwrap();
        let t = media.track(0).unwrap();
        assert_eq!(t.language, "und");
        assert_eq!(t.codec, "");
        assert_eq!(t.name.as_deref(), Some("Unknown"));
        assert!(media.duration.is_none());
    }

    #[test]
    fn upper_case_tags() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "subtitle",
            "tags": {"LANGUAGE": "fre", "TITLE": "Forced"}}]}"#;
        let media = parse_ffprobe_output(Path::new("a.ts"), json).unwrap();
        let t = media.track(0).unwrap();
        assert_eq!(t.language, "fre");
        assert_eq!(t.name.as_deref(), Some("Forced"));
    }

    #[test]
    fn bad_duration_is_ignored() {
        let json = r#"{"streams": [], "format": {"duration": "N/A"}}"#;
        let media = parse_ffprobe_output(Path::new("a.mp4"), json).unwrap();
        assert!(media.duration.is_none());
    }

    #[test]
    fn invalid_json() {
        let err = parse_ffprobe_output(Path::new("a.mp4"), "{").unwrap_err();
        assert_matches!(err, Error::ParseFailed { ref tool, .. } if tool == "ffprobe");
    }
}
