//! Application configuration types.
//!
//! The top-level [`Config`] is deserialized from TOML. Every section
//! defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub mux: MuxConfig,
    pub probe: ProbeConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, missing, or unparseable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, path) in self.tools.overrides() {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name}_path '{}' does not exist; falling back to PATH",
                        p.display()
                    ));
                }
            }
        }

        if self.mux.text_subtitle_codec.trim().is_empty() {
            warnings.push("mux.text_subtitle_codec is empty".into());
        }

        if self.mux.default_language.len() != 3 {
            warnings.push(format!(
                "mux.default_language '{}' is not a three-letter code",
                self.mux.default_language
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Explicit tool locations and the managed install directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub mkvmerge_path: Option<PathBuf>,
    pub mkvextract_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Directory searched after `PATH`.
    pub managed_dir: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            mkvmerge_path: None,
            mkvextract_path: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            managed_dir: default_managed_dir(),
        }
    }
}

impl ToolsConfig {
    /// Override path for a tool by name.
    pub fn override_for(&self, tool: &str) -> Option<&Path> {
        match tool {
            "mkvmerge" => self.mkvmerge_path.as_deref(),
            "mkvextract" => self.mkvextract_path.as_deref(),
            "ffmpeg" => self.ffmpeg_path.as_deref(),
            "ffprobe" => self.ffprobe_path.as_deref(),
            _ => None,
        }
    }

    fn overrides(&self) -> [(&'static str, Option<&Path>); 4] {
        [
            ("mkvmerge", self.mkvmerge_path.as_deref()),
            ("mkvextract", self.mkvextract_path.as_deref()),
            ("ffmpeg", self.ffmpeg_path.as_deref()),
            ("ffprobe", self.ffprobe_path.as_deref()),
        ]
    }
}

#[cfg(windows)]
fn default_managed_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("bin")))
        .unwrap_or_else(|| PathBuf::from("bin"))
}

#[cfg(not(windows))]
fn default_managed_dir() -> PathBuf {
    PathBuf::from(shellexpand::tilde("~/.local/bin").as_ref())
}

/// Command synthesis options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Subtitle codec used when writing non-matroska containers.
    pub text_subtitle_codec: String,
    /// Emit the user's forced flag on edit instead of always clearing it.
    pub preserve_forced: bool,
    /// Language whose first track per type starts as default.
    pub default_language: String,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            text_subtitle_codec: "mov_text".into(),
            preserve_forced: false,
            default_language: "eng".into(),
        }
    }
}

/// Probe behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Reuse results for unchanged files (same path, mtime and size).
    pub cache: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { cache: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.mux.text_subtitle_codec, "mov_text");
        assert!(!cfg.mux.preserve_forced);
        assert_eq!(cfg.mux.default_language, "eng");
        assert!(cfg.probe.cache);
        assert!(cfg.tools.mkvmerge_path.is_none());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_sections() {
        let cfg = Config::from_toml(
            r#"
            [tools]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

            [mux]
            preserve_forced = true
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.tools.override_for("ffmpeg"),
            Some(Path::new("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert!(cfg.tools.override_for("mkvmerge").is_none());
        assert!(cfg.mux.preserve_forced);
        assert_eq!(cfg.mux.text_subtitle_codec, "mov_text");

        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("tools.ffmpeg_path"));
    }

    #[test]
    fn invalid_toml_is_validation_error() {
        let err = Config::from_toml("[mux\n").unwrap_err();
        assert!(err.to_string().contains("config parse error"));
    }

    #[test]
    fn validate_flags_bad_mux_values() {
        let mut cfg = Config::default();
        cfg.mux.text_subtitle_codec = " ".into();
        cfg.mux.default_language = "english".into();
        assert_eq!(cfg.validate().len(), 2);
    }

    #[test]
    fn load_or_default_handles_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let cfg = Config::load_or_default(Some(&missing));
        assert!(cfg.probe.cache);

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "probe = 3").unwrap();
        let cfg = Config::load_or_default(Some(&broken));
        assert!(cfg.probe.cache);

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[probe]\ncache = false\n").unwrap();
        assert!(!Config::load_or_default(Some(&good)).probe.cache);
    }

    #[cfg(not(windows))]
    #[test]
    fn managed_dir_is_expanded() {
        let cfg = ToolsConfig::default();
        assert!(!cfg.managed_dir.to_string_lossy().starts_with('~'));
        assert!(cfg.managed_dir.ends_with(".local/bin"));
    }
}
