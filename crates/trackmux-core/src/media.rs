//! Media data model shared by the prober, the track model and the
//! command synthesizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Track type
// ---------------------------------------------------------------------------

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
}

impl TrackType {
    /// All track types in the order keep-filters are emitted.
    pub const ALL: [TrackType; 3] = [TrackType::Video, TrackType::Audio, TrackType::Subtitle];

    /// Parse a type label as reported by either prober.
    ///
    /// mkvmerge says `subtitles`, ffprobe says `subtitle`; both map to
    /// [`TrackType::Subtitle`]. Anything else (attachments, data streams)
    /// yields `None` and is dropped during normalization.
    pub fn from_probe_label(label: &str) -> Option<Self> {
        match label {
            "video" => Some(TrackType::Video),
            "audio" => Some(TrackType::Audio),
            "subtitle" | "subtitles" => Some(TrackType::Subtitle),
            _ => None,
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
            TrackType::Subtitle => write!(f, "subtitle"),
        }
    }
}

// ---------------------------------------------------------------------------
// Probe dialect
// ---------------------------------------------------------------------------

/// Which prober produced a [`MediaFile`], and therefore which ID space its
/// track ids live in.
///
/// - `Matroska`: ids are the container's own track numbers (mkvmerge `-J`).
/// - `Generic`: ids are 0-based stream indexes (ffprobe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeDialect {
    Matroska,
    Generic,
}

/// File extensions handled by the matroska prober.
const MATROSKA_EXTENSIONS: &[&str] = &["mkv", "mka", "mks", "mk3d"];

impl ProbeDialect {
    /// Select the dialect for a path by its extension.
    pub fn for_path(path: &Path) -> Self {
        let is_matroska = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                MATROSKA_EXTENSIONS.contains(&e.as_str())
            })
            .unwrap_or(false);

        if is_matroska {
            ProbeDialect::Matroska
        } else {
            ProbeDialect::Generic
        }
    }
}

impl fmt::Display for ProbeDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeDialect::Matroska => write!(f, "matroska"),
            ProbeDialect::Generic => write!(f, "generic"),
        }
    }
}

// ---------------------------------------------------------------------------
// Output container
// ---------------------------------------------------------------------------

/// Requested output container for edit, mux and create operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mkv,
    Mp4,
    Mov,
}

impl Container {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mkv => "mkv",
            Container::Mp4 => "mp4",
            Container::Mov => "mov",
        }
    }

    /// Whether mkvmerge can write this container directly.
    pub fn is_matroska(&self) -> bool {
        matches!(self, Container::Mkv)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mkv" | "matroska" => Ok(Container::Mkv),
            "mp4" => Ok(Container::Mp4),
            "mov" => Ok(Container::Mov),
            other => Err(Error::Validation(format!(
                "unsupported container '{other}' (expected mkv, mp4 or mov)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Track / MediaFile
// ---------------------------------------------------------------------------

/// One stream inside a probed media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Track id; see [`ProbeDialect`] for which ID space applies.
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: TrackType,
    /// Free-text codec identifier. Only used to pick extraction extensions.
    pub codec: String,
    /// Three-letter language code or `und`.
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default flag as stored in the source file.
    #[serde(default)]
    pub default_track: bool,
    /// Forced flag as stored in the source file.
    #[serde(default)]
    pub forced_track: bool,
}

/// A probed media file. Immutable once built; user edits live in
/// [`crate::tracks::TrackModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub dialect: ProbeDialect,
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl MediaFile {
    /// Look up a track by id.
    pub fn track(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Tracks of one type in probe order.
    pub fn tracks_of(&self, kind: TrackType) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// File name without its extension, used as the base of derived names.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name including the extension.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
