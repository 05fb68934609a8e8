//! External subtitle files queued for muxing onto a video.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::language::{self, Language};

/// A standalone subtitle file. Always a single track, so mux flags address
/// it as track `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSubtitle {
    pub path: PathBuf,
    pub language_code: String,
    pub language_name: String,
    pub track_name: String,
    pub is_default: bool,
    pub is_forced: bool,
    #[serde(default)]
    pub is_sdh: bool,
}

impl ExternalSubtitle {
    /// Build an entry from a filename, detecting its language.
    ///
    /// Undetectable languages fall back to `fallback`. The track name starts
    /// as the language label and the file is marked default when its
    /// language equals `fallback`. `forced` and `sdh` in the file name set
    /// the matching flags.
    pub fn from_path(path: impl Into<PathBuf>, fallback: Language) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lower = file_name.to_ascii_lowercase();

        let lang = language::detect(&file_name).unwrap_or(fallback);

        Self {
            language_code: lang.code.to_string(),
            language_name: lang.label.to_string(),
            track_name: lang.label.to_string(),
            is_default: lang.code == fallback.code,
            is_forced: lower.contains("forced"),
            is_sdh: lower.contains("sdh"),
            path,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Ordered list of external subtitles. List order is container track order.
#[derive(Debug, Clone, Default)]
pub struct SubtitleList {
    items: Vec<ExternalSubtitle>,
}

impl SubtitleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subtitle. If another entry is already default, the new one
    /// is added as non-default.
    pub fn add(&mut self, mut sub: ExternalSubtitle) {
        if sub.is_default && self.items.iter().any(|s| s.is_default) {
            sub.is_default = false;
        }
        tracing::debug!(file = %sub.path.display(), lang = %sub.language_code, "subtitle added");
        self.items.push(sub);
    }

    /// Detect and append a subtitle file.
    pub fn add_path(&mut self, path: &Path, fallback: Language) {
        self.add(ExternalSubtitle::from_path(path, fallback));
    }

    /// Remove the entry at `index`; out-of-range indexes are ignored.
    pub fn remove(&mut self, index: usize) -> Option<ExternalSubtitle> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Set or clear the default flag; setting one clears all others.
    pub fn set_default(&mut self, index: usize, is_default: bool) {
        if index >= self.items.len() {
            return;
        }
        if is_default {
            for sub in &mut self.items {
                sub.is_default = false;
            }
        }
        self.items[index].is_default = is_default;
    }

    pub fn set_forced(&mut self, index: usize, forced: bool) {
        if let Some(sub) = self.items.get_mut(index) {
            sub.is_forced = forced;
        }
    }

    pub fn set_language(&mut self, index: usize, code: &str) {
        if let Some(sub) = self.items.get_mut(index) {
            sub.language_code = code.to_string();
            sub.language_name = language::label_for(code).unwrap_or(code).to_string();
        }
    }

    pub fn set_track_name(&mut self, index: usize, name: impl Into<String>) {
        if let Some(sub) = self.items.get_mut(index) {
            sub.track_name = name.into();
        }
    }

    pub fn as_slice(&self) -> &[ExternalSubtitle] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
