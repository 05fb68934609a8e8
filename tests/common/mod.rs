//! Shared fixtures for integration tests.
//!
//! Probe JSON captured from real tools, and on Unix, helpers that write
//! fake tool scripts into a temp directory so the runner and service can
//! be exercised without MKVToolNix or FFmpeg installed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// `mkvmerge -J` for a three-track matroska file.
pub const MKVMERGE_MOVIE: &str = r#"{
  "container": {
    "properties": { "duration": 5400000000000, "title": "Movie" },
    "recognized": true,
    "supported": true,
    "type": "Matroska"
  },
  "errors": [],
  "file_name": "movie.mkv",
  "tracks": [
    {
      "codec": "AVC/H.264/MPEG-4p10",
      "id": 0,
      "properties": { "codec_id": "V_MPEG4/ISO/AVC", "language": "und", "default_track": true },
      "type": "video"
    },
    {
      "codec": "AAC",
      "id": 1,
      "properties": { "codec_id": "A_AAC", "language": "eng", "default_track": true },
      "type": "audio"
    },
    {
      "codec": "SubRip/SRT",
      "id": 2,
      "properties": { "codec_id": "S_TEXT/UTF8", "language": "spa", "track_name": "Spanish" },
      "type": "subtitles"
    }
  ],
  "warnings": []
}"#;

/// ffprobe JSON for an mp4 with two audio streams and a data stream.
pub const FFPROBE_CLIP: &str = r#"{
  "streams": [
    { "index": 0, "codec_type": "video", "codec_name": "h264",
      "disposition": { "default": 1, "forced": 0 }, "tags": { "language": "und" } },
    { "index": 1, "codec_type": "audio", "codec_name": "aac",
      "disposition": { "default": 1, "forced": 0 }, "tags": { "language": "eng", "title": "Stereo" } },
    { "index": 2, "codec_type": "audio", "codec_name": "ac3",
      "disposition": { "default": 0, "forced": 0 }, "tags": { "language": "por" } },
    { "index": 3, "codec_type": "data", "codec_name": "bin_data" }
  ],
  "format": { "duration": "95.500000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2" }
}"#;

/// Create an empty file standing in for a media file.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").expect("write placeholder");
    path
}

/// Write an executable shell script named `name` into `dir`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// A fake mkvmerge: `-J` prints `probe_json`; anything else records its
/// arguments one per line in `args_log`, prints progress and a warning,
/// and exits 1.
#[cfg(unix)]
pub fn fake_mkvmerge(dir: &Path, probe_json: &str, args_log: &Path) -> PathBuf {
    let body = format!(
        r#"if [ "$1" = "-J" ]; then
cat <<'JSON'
{probe_json}
JSON
exit 0
fi
printf '%s\n' "$@" > '{log}'
echo 'Progress: 50%'
echo 'Progress: 100%'
echo 'Warning: the track 1 has no language set.'
exit 1"#,
        log = args_log.display()
    );
    fake_tool(dir, "mkvmerge", &body)
}

/// A fake mkvextract that creates every `id:path` target it is given.
#[cfg(unix)]
pub fn fake_mkvextract(dir: &Path) -> PathBuf {
    fake_tool(
        dir,
        "mkvextract",
        r#"shift 2
for target in "$@"; do
  : > "${target#*:}"
done
echo 'Progress: 100%'
exit 0"#,
    )
}

/// Config TOML pointing the matroska tools at fake scripts.
pub fn tools_config(mkvmerge: &Path, mkvextract: &Path, managed_dir: &Path) -> String {
    format!(
        "[tools]\nmkvmerge_path = '{}'\nmkvextract_path = '{}'\nmanaged_dir = '{}'\n",
        mkvmerge.display(),
        mkvextract.display(),
        managed_dir.display()
    )
}
