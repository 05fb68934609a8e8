//! Unified error type for trackmux.
//!
//! Every library failure is funnelled into [`Error`]. The variants mirror the
//! points where an action can stop: resolving a tool, probing a file, building
//! a command plan, spawning a process, or the process itself failing.

/// Unified error type covering all failure modes in trackmux.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external binary could not be resolved.
    #[error("{tool} not found: {hint}")]
    ToolMissing {
        /// Name of the missing tool (e.g. "mkvmerge").
        tool: String,
        /// Remediation message shown to the user.
        hint: String,
    },

    /// The probing tool ran but reported an error.
    #[error("Probe failed [{tool}]: {message}")]
    ProbeFailed {
        /// Name of the prober.
        tool: String,
        /// The tool's own error text.
        message: String,
    },

    /// The probing tool produced output that could not be parsed.
    #[error("Parse failed [{tool}]: {message}")]
    ParseFailed {
        /// Name of the prober.
        tool: String,
        /// Parser error description.
        message: String,
    },

    /// A command plan was requested from an invalid state.
    #[error("Cannot build command: {0}")]
    SynthesisPrecondition(String),

    /// The operating system could not start the subprocess.
    #[error("Failed to start [{tool}]: {message}")]
    ProcessSpawnFailed {
        /// Name of the tool that failed to start.
        tool: String,
        /// OS error text.
        message: String,
    },

    /// The tool ran and exited with a failing status.
    #[error("Tool error [{tool}] (exit {code}): {message}")]
    ToolExitNonZero {
        /// Name of the tool.
        tool: String,
        /// Process exit code.
        code: i32,
        /// Captured stderr, falling back to stdout.
        message: String,
    },

    /// User input was rejected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed outside of probing.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde_json error.
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::ToolMissing`] with the standard
    /// remediation hint for `tool`.
    pub fn tool_missing(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let hint = remediation_hint(&tool).to_string();
        Error::ToolMissing { tool, hint }
    }

    /// Convenience constructor for [`Error::ProbeFailed`].
    pub fn probe_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProbeFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::ParseFailed`].
    pub fn parse_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ParseFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::SynthesisPrecondition`].
    pub fn precondition(message: impl Into<String>) -> Self {
        Error::SynthesisPrecondition(message.into())
    }

    /// Convenience constructor for [`Error::ProcessSpawnFailed`].
    pub fn spawn_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProcessSpawnFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::ToolExitNonZero`].
    pub fn exit_non_zero(tool: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Error::ToolExitNonZero {
            tool: tool.into(),
            code,
            message: message.into(),
        }
    }

    /// Nothing in trackmux is retried automatically; every failure is
    /// terminal for the action that triggered it.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// True when the error was detected before any process was started.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Error::ToolMissing { .. } | Error::SynthesisPrecondition(_) | Error::Validation(_)
        )
    }
}

/// Remediation hint for a missing tool.
pub fn remediation_hint(tool: &str) -> &'static str {
    match tool {
        "mkvmerge" | "mkvextract" => "MKVToolNix is missing. Please install it.",
        "ffmpeg" | "ffprobe" => "FFmpeg is missing. Please install it.",
        _ => "is it installed and in PATH?",
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn tool_missing_carries_hint() {
        let err = Error::tool_missing("mkvmerge");
        assert_eq!(
            err.to_string(),
            "mkvmerge not found: MKVToolNix is missing. Please install it."
        );
        assert!(err.is_pre_execution());

        let err = Error::tool_missing("ffprobe");
        assert!(err.to_string().contains("FFmpeg is missing"));
    }

    #[test]
    fn probe_failed_display() {
        let err = Error::probe_failed("ffprobe", "Invalid data found");
        assert_eq!(err.to_string(), "Probe failed [ffprobe]: Invalid data found");
        assert!(!err.is_pre_execution());
    }

    #[test]
    fn parse_failed_display() {
        let err = Error::parse_failed("mkvmerge", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "Parse failed [mkvmerge]: expected value at line 1"
        );
    }

    #[test]
    fn precondition_display() {
        let err = Error::precondition("no tracks selected");
        assert_eq!(err.to_string(), "Cannot build command: no tracks selected");
        assert!(err.is_pre_execution());
    }

    #[test]
    fn exit_non_zero_display() {
        let err = Error::exit_non_zero("mkvmerge", 2, "Error: no such file");
        assert_eq!(
            err.to_string(),
            "Tool error [mkvmerge] (exit 2): Error: no such file"
        );
    }

    #[test]
    fn spawn_failed_display() {
        let err = Error::spawn_failed("ffmpeg", "permission denied");
        assert_eq!(err.to_string(), "Failed to start [ffmpeg]: permission denied");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert_matches!(err, Error::Io { .. });
    }

    #[test]
    fn nothing_is_retryable() {
        assert!(!Error::tool_missing("ffmpeg").is_retryable());
        assert!(!Error::exit_non_zero("ffmpeg", 1, "").is_retryable());
    }

    #[test]
    fn unknown_tool_hint() {
        assert_eq!(remediation_hint("dovi_tool"), "is it installed and in PATH?");
    }
}
