//! Track model: the loaded [`MediaFile`] plus the user's per-track edits.
//!
//! Probed data is never mutated. Every user change lands in a [`TrackEdit`]
//! keyed by track id, and the one cross-track rule (a single default per
//! track type) is enforced here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::media::{MediaFile, Track, TrackType};
use crate::naming;
use crate::sanitize::is_safe;

/// What the loaded tracks are being prepared for. Decides the initial
/// `keep` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditContext {
    /// Remux, edit or mux: everything is kept until deselected.
    Edit,
    /// Extraction: nothing is selected until picked.
    Extract,
}

/// User-adjustable overlay for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEdit {
    pub keep: bool,
    pub language: String,
    pub name: String,
    pub is_default: bool,
    pub is_forced: bool,
    /// Extraction filename, relative to the output directory.
    pub output_filename: String,
}

/// Kept track ids per type, each ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeepGroups {
    pub video: Vec<u32>,
    pub audio: Vec<u32>,
    pub subtitle: Vec<u32>,
}

impl KeepGroups {
    pub fn get(&self, kind: TrackType) -> &[u32] {
        match kind {
            TrackType::Video => &self.video,
            TrackType::Audio => &self.audio,
            TrackType::Subtitle => &self.subtitle,
        }
    }

    fn push(&mut self, kind: TrackType, id: u32) {
        match kind {
            TrackType::Video => self.video.push(id),
            TrackType::Audio => self.audio.push(id),
            TrackType::Subtitle => self.subtitle.push(id),
        }
    }

    /// All kept ids, grouped video, audio, subtitle.
    pub fn all(&self) -> impl Iterator<Item = u32> + '_ {
        self.video
            .iter()
            .chain(&self.audio)
            .chain(&self.subtitle)
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty() && self.subtitle.is_empty()
    }
}

/// In-memory state for the currently loaded file.
#[derive(Debug, Clone)]
pub struct TrackModel {
    context: EditContext,
    default_language: String,
    media: Option<MediaFile>,
    edits: BTreeMap<u32, TrackEdit>,
}

impl TrackModel {
    pub fn new(context: EditContext) -> Self {
        Self::with_default_language(context, "eng")
    }

    /// Model whose seeded default track per type is the first one in
    /// `default_language`.
    pub fn with_default_language(context: EditContext, default_language: impl Into<String>) -> Self {
        Self {
            context,
            default_language: default_language.into(),
            media: None,
            edits: BTreeMap::new(),
        }
    }

    /// Replace all state with a freshly probed file and seed its edits.
    pub fn load(&mut self, media: MediaFile) {
        let mut edits = BTreeMap::new();
        let names: BTreeMap<u32, String> = naming::generate_all(&media).into_iter().collect();

        for track in &media.tracks {
            edits.insert(
                track.id,
                TrackEdit {
                    keep: self.context == EditContext::Edit,
                    language: track.language.clone(),
                    name: track.name.clone().unwrap_or_default(),
                    is_default: false,
                    is_forced: track.forced_track,
                    output_filename: names.get(&track.id).cloned().unwrap_or_default(),
                },
            );
        }

        for kind in TrackType::ALL {
            let mut of_kind: Vec<&Track> = media.tracks_of(kind).collect();
            of_kind.sort_by_key(|t| t.id);
            if let Some(first) = of_kind.iter().find(|t| t.language == self.default_language) {
                if let Some(edit) = edits.get_mut(&first.id) {
                    edit.is_default = true;
                }
            }
        }

        tracing::debug!(
            path = %media.path.display(),
            tracks = media.tracks.len(),
            context = ?self.context,
            "loaded track model"
        );

        self.edits = edits;
        self.media = Some(media);
    }

    /// Drop the loaded file and its edits.
    pub fn clear(&mut self) {
        self.media = None;
        self.edits.clear();
    }

    pub fn context(&self) -> EditContext {
        self.context
    }

    pub fn media(&self) -> Option<&MediaFile> {
        self.media.as_ref()
    }

    pub fn edit(&self, id: u32) -> Option<&TrackEdit> {
        self.edits.get(&id)
    }

    /// Edits in ascending id order.
    pub fn edits(&self) -> impl Iterator<Item = (u32, &TrackEdit)> {
        self.edits.iter().map(|(id, e)| (*id, e))
    }

    pub fn set_keep(&mut self, id: u32, keep: bool) {
        if let Some(edit) = self.edits.get_mut(&id) {
            edit.keep = keep;
        }
    }

    /// Select or deselect every track at once.
    pub fn set_all_keep(&mut self, keep: bool) {
        for edit in self.edits.values_mut() {
            edit.keep = keep;
        }
    }

    pub fn set_language(&mut self, id: u32, code: impl Into<String>) {
        if let Some(edit) = self.edits.get_mut(&id) {
            edit.language = code.into();
        }
    }

    pub fn set_name(&mut self, id: u32, name: impl Into<String>) {
        if let Some(edit) = self.edits.get_mut(&id) {
            edit.name = name.into();
        }
    }

    pub fn set_forced(&mut self, id: u32, forced: bool) {
        if let Some(edit) = self.edits.get_mut(&id) {
            edit.is_forced = forced;
        }
    }

    /// Set or clear the default flag. Setting it clears the flag on every
    /// other track of the same type.
    pub fn set_default(&mut self, id: u32, is_default: bool) {
        let Some(kind) = self.kind_of(id) else {
            return;
        };

        if is_default {
            let siblings: Vec<u32> = self
                .media
                .iter()
                .flat_map(|m| m.tracks_of(kind))
                .map(|t| t.id)
                .filter(|&other| other != id)
                .collect();
            for other in siblings {
                if let Some(edit) = self.edits.get_mut(&other) {
                    edit.is_default = false;
                }
            }
        }

        if let Some(edit) = self.edits.get_mut(&id) {
            edit.is_default = is_default;
        }
    }

    /// Override the extraction filename. Names that are not a single safe
    /// path segment are rejected and leave the edit unchanged.
    pub fn set_output_filename(&mut self, id: u32, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if !is_safe(&name) {
            return Err(Error::Validation(format!(
                "'{}' is not a valid file name",
                name.escape_debug()
            )));
        }
        if let Some(edit) = self.edits.get_mut(&id) {
            edit.output_filename = name;
        }
        Ok(())
    }

    pub fn is_default(&self, id: u32) -> bool {
        self.edits.get(&id).map(|e| e.is_default).unwrap_or(false)
    }

    /// Kept ids grouped by type. An empty group means "drop every track of
    /// this type".
    pub fn grouped_keep_ids(&self) -> KeepGroups {
        let mut groups = KeepGroups::default();
        for (track, _) in self.kept_tracks() {
            groups.push(track.kind, track.id);
        }
        groups
    }

    /// Kept tracks with their edits, ascending by id.
    pub fn kept_tracks(&self) -> Vec<(&Track, &TrackEdit)> {
        let Some(media) = &self.media else {
            return Vec::new();
        };
        let mut kept: Vec<(&Track, &TrackEdit)> = media
            .tracks
            .iter()
            .filter_map(|t| self.edits.get(&t.id).map(|e| (t, e)))
            .filter(|(_, e)| e.keep)
            .collect();
        kept.sort_by_key(|(t, _)| t.id);
        kept
    }

    fn kind_of(&self, id: u32) -> Option<TrackType> {
        self.media.as_ref()?.track(id).map(|t| t.kind)
    }
}
