//! mkvmerge / mkvextract argument rules.

use trackmux_core::{ExternalSubtitle, KeepGroups, TrackModel, TrackType};

use super::ArgList;

/// Allow-list flag and blanket-exclude flag per track type.
fn keep_flags(kind: TrackType) -> (&'static str, &'static str) {
    match kind {
        TrackType::Video => ("--video-tracks", "--no-video"),
        TrackType::Audio => ("--audio-tracks", "--no-audio"),
        TrackType::Subtitle => ("--subtitle-tracks", "--no-subtitles"),
    }
}

/// One flag per type: the explicit id list when non-empty, otherwise the
/// blanket exclusion. mkvmerge keeps everything when neither is given, so
/// one of the two is always emitted.
pub(super) fn push_keep_filters(args: &mut ArgList, groups: &KeepGroups) {
    for kind in TrackType::ALL {
        let ids = groups.get(kind);
        let (only, none) = keep_flags(kind);
        if ids.is_empty() {
            args.push(none);
        } else {
            let list = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
            args.push(only);
            args.push(list);
        }
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

/// Per-track metadata for every kept track, ascending by id.
pub(super) fn push_track_options(args: &mut ArgList, model: &TrackModel, preserve_forced: bool) {
    for (track, edit) in model.kept_tracks() {
        let id = track.id;
        args.push("--language");
        args.push(format!("{id}:{}", edit.language));
        args.push("--track-name");
        args.push(format!("{id}:{}", edit.name));
        args.push("--default-track-flag");
        args.push(format!("{id}:{}", flag(edit.is_default)));
        args.push("--forced-display-flag");
        args.push(format!("{id}:{}", flag(preserve_forced && edit.is_forced)));
    }
}

/// Flag block for one external subtitle. Must directly precede the file
/// it applies to; subtitle files hold a single track, hence id 0.
pub(super) fn push_subtitle_block(args: &mut ArgList, sub: &ExternalSubtitle, preserve_forced: bool) {
    args.push("--language");
    args.push(format!("0:{}", sub.language_code));
    if !sub.track_name.is_empty() {
        args.push("--track-name");
        args.push(format!("0:{}", sub.track_name));
    }
    args.push("--default-track-flag");
    args.push(format!("0:{}", flag(sub.is_default)));
    args.push("--forced-display-flag");
    args.push(format!("0:{}", flag(preserve_forced && sub.is_forced)));
    args.push_path(&sub.path);
}
