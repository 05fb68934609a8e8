//! Filename sanitizer and validator.
//!
//! [`sanitize`] repairs derived or user-supplied names into a single safe
//! path segment. [`is_safe`] only checks, and is used to reject user-typed
//! output filenames before they reach the command synthesizer.

use std::path::{Path, PathBuf};

/// Returned by [`sanitize`] when nothing usable is left.
pub const UNNAMED: &str = "unnamed_file";

/// Replacement for characters outside the allowed set.
const PLACEHOLDER: char = '_';

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-')
}

/// Reduce `raw` to a safe single path segment.
///
/// Only the final segment survives (both `/` and `\` count as separators),
/// characters outside `[A-Za-z0-9 ._-]` become `_`, and leading or trailing
/// dots and spaces are trimmed. Never fails and is idempotent.
pub fn sanitize(raw: &str) -> String {
    let last = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");

    let replaced: String = last
        .chars()
        .map(|c| if is_allowed(c) { c } else { PLACEHOLDER })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c == ' ');
    if trimmed.is_empty() {
        UNNAMED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Check a user-typed filename without modifying it.
///
/// Rejects empty or blank names, anything containing a path separator of
/// either OS style or a NUL byte, and the special names `.` and `..`.
pub fn is_safe(name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }
    if name.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
        return false;
    }
    name != "." && name != ".."
}

/// Keep only allowed characters of a free-text fragment such as a track
/// title. Unlike [`sanitize`], disallowed characters are dropped rather than
/// replaced, and an empty result is `None`.
pub fn strip_fragment(raw: &str) -> Option<String> {
    let kept: String = raw.chars().filter(|&c| is_allowed(c)).collect();
    let kept = kept.trim();
    if kept.is_empty() {
        None
    } else {
        Some(kept.to_string())
    }
}

/// Join a sanitized form of `raw` onto `dir`. The result is always a direct
/// child of `dir`.
pub fn anchored(dir: &Path, raw: &str) -> PathBuf {
    dir.join(sanitize(raw))
}
