//! ffmpeg argument rules, used for non-matroska outputs and for any
//! source whose track ids are ffprobe stream indexes.

use trackmux_core::Container;

use super::ArgList;

/// Matroska cannot carry `mov_text`, so text subtitles written there by
/// ffmpeg become SubRip.
pub(super) fn subtitle_codec(container: Container, configured: &str) -> &str {
    if container.is_matroska() {
        "srt"
    } else {
        configured
    }
}

/// Stream copy for audio and video, text re-encode for subtitles.
pub(super) fn push_codecs(args: &mut ArgList, text_subtitle_codec: &str) {
    args.extend(["-c:v", "copy", "-c:a", "copy", "-c:s"]);
    args.push(text_subtitle_codec);
}

/// Language, title and default disposition for output stream `index`.
pub(super) fn push_stream_metadata(
    args: &mut ArgList,
    index: usize,
    language: &str,
    title: &str,
    is_default: bool,
) {
    args.push(format!("-metadata:s:{index}"));
    args.push(format!("language={language}"));
    if !title.is_empty() {
        args.push(format!("-metadata:s:{index}"));
        args.push(format!("title={title}"));
    }
    args.push(format!("-disposition:{index}"));
    args.push(if is_default { "default" } else { "0" });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matroska_subtitles_become_srt() {
        assert_eq!(subtitle_codec(Container::Mkv, "mov_text"), "srt");
        assert_eq!(subtitle_codec(Container::Mp4, "mov_text"), "mov_text");
        assert_eq!(subtitle_codec(Container::Mov, "ass"), "ass");
    }
}
