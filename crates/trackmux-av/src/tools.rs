//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the four tools trackmux drives (mkvmerge,
//! mkvextract, ffmpeg, ffprobe) once and hands out their paths to the prober
//! and the command synthesizer.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trackmux_core::config::ToolsConfig;

/// An external tool trackmux knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Mkvmerge,
    Mkvextract,
    Ffmpeg,
    Ffprobe,
}

/// How a tool's exit code is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitConvention {
    /// MKVToolNix: 0 success, 1 success with warnings, 2+ error.
    Graded,
    /// Zero is success, anything else is failure.
    Binary,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Mkvmerge, Tool::Mkvextract, Tool::Ffmpeg, Tool::Ffprobe];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Mkvmerge => "mkvmerge",
            Tool::Mkvextract => "mkvextract",
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }

    /// Executable file name on this platform.
    pub fn binary_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.name())
        } else {
            self.name().to_string()
        }
    }

    fn version_flag(&self) -> &'static str {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => "-version",
            Tool::Mkvmerge | Tool::Mkvextract => "--version",
        }
    }

    pub fn exit_convention(&self) -> ExitConvention {
        match self {
            Tool::Mkvmerge | Tool::Mkvextract => ExitConvention::Graded,
            Tool::Ffmpeg | Tool::Ffprobe => ExitConvention::Binary,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub tool: Tool,
    pub available: bool,
    /// First line of the version output, if available.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry holding resolved tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<Tool, PathBuf>,
}

impl ToolRegistry {
    /// Resolve every known tool.
    ///
    /// Order: the config override if that file exists, then `PATH` via
    /// [`which::which`], then the managed install directory. Tools that are
    /// not found are omitted.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for tool in Tool::ALL {
            let custom = config.override_for(tool.name()).filter(|p| p.exists());
            if let Some(p) = config.override_for(tool.name()) {
                if custom.is_none() {
                    tracing::warn!(tool = %tool, path = %p.display(), "configured path does not exist");
                }
            }

            let resolved = custom
                .map(Path::to_path_buf)
                .or_else(|| which::which(tool.binary_name()).ok())
                .or_else(|| {
                    let managed = config.managed_dir.join(tool.binary_name());
                    managed.is_file().then_some(managed)
                });

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = %tool, path = %path.display(), "resolved tool");
                    tools.insert(tool, path);
                }
                None => tracing::debug!(tool = %tool, "tool not found"),
            }
        }

        Self { tools }
    }

    /// Registry with explicit paths, bypassing discovery.
    pub fn from_paths(paths: impl IntoIterator<Item = (Tool, PathBuf)>) -> Self {
        Self {
            tools: paths.into_iter().collect(),
        }
    }

    /// Path for `tool`, or [`trackmux_core::Error::ToolMissing`].
    pub fn require(&self, tool: Tool) -> trackmux_core::Result<&Path> {
        self.tools
            .get(&tool)
            .map(PathBuf::as_path)
            .ok_or_else(|| trackmux_core::Error::tool_missing(tool.name()))
    }

    pub fn get(&self, tool: Tool) -> Option<&Path> {
        self.tools.get(&tool).map(PathBuf::as_path)
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        Tool::ALL
            .iter()
            .map(|&tool| match self.tools.get(&tool) {
                Some(path) => ToolInfo {
                    tool,
                    available: true,
                    version: detect_version(tool, path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    tool,
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run the tool's version flag and return the first line of stdout.
fn detect_version(tool: Tool, path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg(tool.version_flag())
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
