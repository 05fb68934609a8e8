//! Probe adapter: pick a prober by extension and normalize its output into
//! a [`MediaFile`].

mod cache;
mod ffprobe;
mod mkvmerge;

use std::path::Path;

use trackmux_core::{Error, MediaFile, ProbeDialect, Result};

use crate::command::{ToolCommand, NOT_FOUND_CODE};
use crate::tools::{Tool, ToolRegistry};

pub use cache::{CacheKey, ProbeCache};
pub use ffprobe::{parse_ffprobe_output, FfprobeProber};
pub use mkvmerge::{parse_mkvmerge_output, MkvmergeProber};

/// A media file prober for one [`ProbeDialect`].
///
/// Implementations must be safe to share across threads (`Send + Sync`).
/// Probing is blocking; async callers should use `spawn_blocking`.
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// The ID space of the tracks this prober returns.
    fn dialect(&self) -> ProbeDialect;

    /// Probe a media file and normalize its tracks.
    fn probe(&self, path: &Path) -> Result<MediaFile>;
}

/// Run a prober tool synchronously and return its stdout.
///
/// `error_detail` may pull a better message out of stdout when the tool
/// reports failures there instead of on stderr.
pub(crate) fn run_prober(
    tool: &str,
    program: &Path,
    args: &[String],
    error_detail: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let mut cmd = ToolCommand::new(program);
    cmd.args(args.iter().cloned());
    let output = cmd.run_sync();

    if !output.started {
        return Err(match output.code {
            NOT_FOUND_CODE => Error::tool_missing(tool),
            _ => Error::spawn_failed(tool, output.stderr),
        });
    }

    match output.code {
        0 => Ok(output.stdout),
        code => {
            let message = error_detail(&output.stdout)
                .or_else(|| non_empty(&output.stderr))
                .or_else(|| non_empty(&output.stdout))
                .unwrap_or_else(|| format!("exited with code {code}"));
            Err(Error::probe_failed(tool, message))
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Dispatches to the matroska or generic prober and caches results.
pub struct ProbeAdapter {
    matroska: Option<Box<dyn Prober>>,
    generic: Option<Box<dyn Prober>>,
    cache: Option<ProbeCache>,
}

impl std::fmt::Debug for ProbeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeAdapter")
            .field("matroska", &self.matroska.as_ref().map(|p| p.name()))
            .field("generic", &self.generic.as_ref().map(|p| p.name()))
            .field("cache", &self.cache.as_ref().map(ProbeCache::len))
            .finish()
    }
}

impl ProbeAdapter {
    /// Use mkvmerge and ffprobe as resolved by `registry`. A tool that is
    /// missing only fails probes that need it.
    pub fn from_registry(registry: &ToolRegistry) -> Self {
        Self {
            matroska: registry
                .get(Tool::Mkvmerge)
                .map(|p| Box::new(MkvmergeProber::new(p)) as Box<dyn Prober>),
            generic: registry
                .get(Tool::Ffprobe)
                .map(|p| Box::new(FfprobeProber::new(p)) as Box<dyn Prober>),
            cache: None,
        }
    }

    /// Use custom probers.
    pub fn with_probers(
        matroska: Option<Box<dyn Prober>>,
        generic: Option<Box<dyn Prober>>,
    ) -> Self {
        Self {
            matroska,
            generic,
            cache: None,
        }
    }

    /// Enable or disable the (path, mtime, size) cache.
    pub fn cached(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(ProbeCache::new);
        self
    }

    pub fn cache(&self) -> Option<&ProbeCache> {
        self.cache.as_ref()
    }

    /// Probe `path`, dispatching on its extension.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be stat'ed.
    /// - [`Error::ToolMissing`] if the required prober is unavailable.
    /// - [`Error::ProbeFailed`] / [`Error::ParseFailed`] from the prober.
    pub fn probe(&self, path: &Path) -> Result<MediaFile> {
        let key = CacheKey::for_path(path)?;
        let dialect = ProbeDialect::for_path(path);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(path, key) {
                tracing::debug!(path = %path.display(), "probe cache hit");
                return Ok(hit);
            }
        }

        let (prober, tool) = match dialect {
            ProbeDialect::Matroska => (&self.matroska, Tool::Mkvmerge),
            ProbeDialect::Generic => (&self.generic, Tool::Ffprobe),
        };
        let prober = prober
            .as_ref()
            .ok_or_else(|| Error::tool_missing(tool.name()))?;

        tracing::debug!(path = %path.display(), prober = prober.name(), %dialect, "probing");
        let media = prober.probe(path)?;

        if let Some(cache) = &self.cache {
            cache.insert(path, key, media.clone());
        }
        Ok(media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingProber {
        dialect: ProbeDialect,
        calls: Arc<AtomicUsize>,
    }

    impl Prober for CountingProber {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn dialect(&self) -> ProbeDialect {
            self.dialect
        }

        fn probe(&self, path: &Path) -> Result<MediaFile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MediaFile {
                path: path.to_path_buf(),
                dialect: self.dialect,
                tracks: Vec::new(),
                duration: None,
            })
        }
    }

    fn counting(dialect: ProbeDialect) -> (Box<dyn Prober>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(CountingProber {
                dialect,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[test]
    fn dispatches_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mkv = dir.path().join("a.mkv");
        let mp4 = dir.path().join("a.mp4");
        std::fs::write(&mkv, b"x").unwrap();
        std::fs::write(&mp4, b"x").unwrap();

        let (m, m_calls) = counting(ProbeDialect::Matroska);
        let (g, g_calls) = counting(ProbeDialect::Generic);
        let adapter = ProbeAdapter::with_probers(Some(m), Some(g));

        assert_eq!(adapter.probe(&mkv).unwrap().dialect, ProbeDialect::Matroska);
        assert_eq!(adapter.probe(&mp4).unwrap().dialect, ProbeDialect::Generic);
        assert_eq!(m_calls.load(Ordering::SeqCst), 1);
        assert_eq!(g_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_prober_is_tool_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mkv = dir.path().join("a.mkv");
        std::fs::write(&mkv, b"x").unwrap();

        let adapter = ProbeAdapter::with_probers(None, None);
        assert_matches!(
            adapter.probe(&mkv),
            Err(Error::ToolMissing { ref tool, .. }) if tool == "mkvmerge"
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let adapter = ProbeAdapter::with_probers(None, None);
        assert_matches!(
            adapter.probe(Path::new("/definitely/not/here.mkv")),
            Err(Error::Io { .. })
        );
    }

    #[test]
    fn cache_skips_unchanged_files() {
        let dir = tempfile::tempdir().unwrap();
        let mp4 = dir.path().join("a.mp4");
        std::fs::write(&mp4, b"x").unwrap();

        let (g, calls) = counting(ProbeDialect::Generic);
        let adapter = ProbeAdapter::with_probers(None, Some(g)).cached(true);

        adapter.probe(&mp4).unwrap();
        adapter.probe(&mp4).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        std::fs::write(&mp4, b"longer").unwrap();
        adapter.probe(&mp4).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn uncached_adapter_always_probes() {
        let dir = tempfile::tempdir().unwrap();
        let mp4 = dir.path().join("a.mp4");
        std::fs::write(&mp4, b"x").unwrap();

        let (g, calls) = counting(ProbeDialect::Generic);
        let adapter = ProbeAdapter::with_probers(None, Some(g));
        adapter.probe(&mp4).unwrap();
        adapter.probe(&mp4).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(adapter.cache().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_is_probe_failed() {
        let err = run_prober(
            "sh",
            Path::new("sh"),
            &["-c".into(), "echo 'Invalid data found' >&2; exit 1".into()],
            |_| None,
        )
        .unwrap_err();
        assert_matches!(err, Error::ProbeFailed { ref message, .. } if message == "Invalid data found");
    }

    #[cfg(unix)]
    #[test]
    fn tool_exiting_127_is_probe_failed() {
        let err = run_prober("sh", Path::new("sh"), &["-c".into(), "exit 127".into()], |_| None)
            .unwrap_err();
        assert_matches!(
            err,
            Error::ProbeFailed { ref message, .. } if message == "exited with code 127"
        );
    }

    #[cfg(unix)]
    #[test]
    fn dash_prefixed_source_is_passed_as_a_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("args");
        let mkvmerge = dir.path().join("mkvmerge");
        std::fs::write(
            &mkvmerge,
            format!(
                "#!/bin/sh\nfor a in \"$@\"; do printf '%s\\n' \"$a\" >> '{}'; done\necho '{{}}'\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&mkvmerge, std::fs::Permissions::from_mode(0o755)).unwrap();

        let _ = MkvmergeProber::new(&mkvmerge).probe(Path::new("-x.mkv"));
        let args = std::fs::read_to_string(&log).unwrap();
        assert_eq!(args.lines().collect::<Vec<_>>(), ["-J", "./-x.mkv"]);
    }

    #[test]
    fn vanished_tool_is_tool_missing() {
        let err = run_prober("ffprobe", Path::new("nonexistent_tool_xyz_12345"), &[], |_| None)
            .unwrap_err();
        assert_matches!(err, Error::ToolMissing { .. });
    }
}
