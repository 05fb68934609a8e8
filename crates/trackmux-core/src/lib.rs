//! trackmux-core: the track data model and everything about it that does
//! not touch an external process.
//!
//! Probed files are represented as [`MediaFile`]s, user edits live in the
//! [`tracks::TrackModel`] overlay, and derived filenames come from
//! [`naming`] after passing through [`sanitize`].

pub mod config;
pub mod error;
pub mod language;
pub mod media;
pub mod naming;
pub mod sanitize;
pub mod subtitles;
pub mod tracks;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::*;
pub use subtitles::{ExternalSubtitle, SubtitleList};
pub use tracks::{EditContext, KeepGroups, TrackEdit, TrackModel};
