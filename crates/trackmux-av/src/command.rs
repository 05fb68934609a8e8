//! Process runner for external tool invocations.
//!
//! [`ToolCommand::run_sync`] is for short, bounded probe calls.
//! [`ToolCommand::spawn`] starts a process on a background task and returns
//! a [`RunHandle`]: stdout and stderr share one pipe, so lines arrive on a
//! channel in the order the process wrote them, and the [`RunCompletion`] resolves strictly after
//! the last line and after the process has exited.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit code reported when the process could not be started or did not
/// exit on its own (cancelled, timed out, killed by a signal).
pub const SPAWN_FAILED_CODE: i32 = -1;

/// Exit code reported by [`ToolCommand::run_sync`] when the executable does
/// not exist.
pub const NOT_FOUND_CODE: i32 = 127;

/// Render a path as a single argument that cannot be mistaken for a flag:
/// relative paths starting with `-` get a `./` prefix.
pub(crate) fn path_arg(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        format!("./{s}")
    } else {
        s.into_owned()
    }
}

/// Output captured by [`ToolCommand::run_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: i32,
    /// Whether the process was started at all. When false, `code` is
    /// [`NOT_FOUND_CODE`] or [`SPAWN_FAILED_CODE`] and `stderr` holds the
    /// reason.
    pub started: bool,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// How a spawned process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process exited by itself with this code.
    Exited(i32),
    /// The process could not be started.
    SpawnFailed,
    /// [`RunHandle::cancel`] was called and the child was killed.
    Cancelled,
    /// The configured timeout elapsed and the child was killed.
    TimedOut(Duration),
}

/// Final outcome of a spawned process.
#[derive(Debug, Clone)]
pub struct RunCompletion {
    pub termination: Termination,
    /// Every delivered line, in the order the process wrote it, joined
    /// with `\n`. stdout and stderr share one pipe so they cannot be told
    /// apart here. For a spawn failure this is the error text.
    pub output: String,
}

impl RunCompletion {
    /// Exit code, or [`SPAWN_FAILED_CODE`] if the process did not exit by
    /// itself.
    pub fn code(&self) -> i32 {
        match self.termination {
            Termination::Exited(code) => code,
            _ => SPAWN_FAILED_CODE,
        }
    }

    fn not_started(message: String) -> Self {
        Self {
            termination: Termination::SpawnFailed,
            output: message,
        }
    }
}

/// Handle to a process started with [`ToolCommand::spawn`].
#[derive(Debug)]
pub struct RunHandle {
    lines: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    task: JoinHandle<RunCompletion>,
}

impl RunHandle {
    /// Next output line, or `None` once the process is done.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Kill the child. The completion reports [`Termination::Cancelled`]
    /// once the child is gone.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Deliver every remaining line to `on_line`, then return the
    /// completion.
    pub async fn wait_with(mut self, mut on_line: impl FnMut(&str)) -> RunCompletion {
        while let Some(line) = self.lines.recv().await {
            on_line(&line);
        }
        join(self.task).await
    }

    /// Discard remaining lines and return the completion.
    pub async fn wait(self) -> RunCompletion {
        drop(self.lines);
        join(self.task).await
    }
}

async fn join(task: JoinHandle<RunCompletion>) -> RunCompletion {
    match task.await {
        Ok(completion) => completion,
        Err(e) => RunCompletion::not_started(format!("runner task failed: {e}")),
    }
}

/// A builder for constructing and executing external tool invocations.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Kill the process if it runs longer than `d`. Applies to
    /// [`ToolCommand::spawn`] only.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Run to completion on the current thread, capturing both streams.
    ///
    /// A missing executable yields code [`NOT_FOUND_CODE`] with a fixed
    /// message, any other start failure yields [`SPAWN_FAILED_CODE`].
    pub fn run_sync(&self) -> ToolOutput {
        tracing::debug!(program = %self.program.display(), args = ?self.args, "running");

        match std::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => ToolOutput {
                code: output.status.code().unwrap_or(SPAWN_FAILED_CODE),
                started: true,
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ToolOutput {
                code: NOT_FOUND_CODE,
                started: false,
                stdout: String::new(),
                stderr: format!("Command not found: {}", self.program.display()),
            },
            Err(e) => ToolOutput {
                code: SPAWN_FAILED_CODE,
                started: false,
                stdout: String::new(),
                stderr: format!("failed to spawn {}: {e}", self.program_name()),
            },
        }
    }

    /// Start the process on a background task. Must be called from within
    /// a tokio runtime.
    ///
    /// A start failure is not an error here: the handle yields no lines and
    /// its completion carries [`Termination::SpawnFailed`] and the error
    /// text.
    pub fn spawn(&self) -> RunHandle {
        self.spawn_with_cancel(CancellationToken::new())
    }

    /// Like [`ToolCommand::spawn`], killing the child once `cancel` is
    /// triggered.
    pub fn spawn_with_cancel(&self, cancel: CancellationToken) -> RunHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(drive(self.clone(), tx, cancel.clone()));
        RunHandle {
            lines: rx,
            cancel,
            task,
        }
    }

    /// Spawn, stream every line to `on_line` and return the completion.
    pub async fn run_async(&self, on_line: impl FnMut(&str)) -> RunCompletion {
        self.spawn().wait_with(on_line).await
    }
}

async fn drive(
    command: ToolCommand,
    tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
) -> RunCompletion {
    let name = command.program_name();

    // One pipe for both streams keeps lines in the order they were written.
    let (reader, writer) = match std::io::pipe() {
        Ok(pair) => pair,
        Err(e) => return RunCompletion::not_started(format!("failed to spawn {name}: {e}")),
    };
    let writer_err = match writer.try_clone() {
        Ok(w) => w,
        Err(e) => return RunCompletion::not_started(format!("failed to spawn {name}: {e}")),
    };

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_err)
        .kill_on_drop(true);
    let spawned = cmd.spawn();
    // The builder owns the parent's write ends; the pipe only reaches EOF
    // once they are closed.
    drop(cmd);

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!(tool = %name, error = %e, "spawn failed");
            return RunCompletion::not_started(format!("failed to spawn {name}: {e}"));
        }
    };

    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    let pump = start_pump(reader, line_tx);

    let deadline = async {
        match command.timeout {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut lines = Vec::new();
    let mut pipe_open = true;

    let termination = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                break Termination::Cancelled;
            }
            _ = &mut deadline => {
                let _ = child.kill().await;
                // The arm only completes when a timeout is set.
                break Termination::TimedOut(command.timeout.unwrap_or_default());
            }
            msg = line_rx.recv(), if pipe_open => match msg {
                Some(line) => {
                    tracing::trace!(tool = %name, "{line}");
                    lines.push(line.clone());
                    let _ = tx.send(line);
                }
                None => pipe_open = false,
            },
            status = child.wait(), if !pipe_open => {
                break match status {
                    Ok(status) => Termination::Exited(status.code().unwrap_or(SPAWN_FAILED_CODE)),
                    Err(e) => {
                        lines.push(format!("failed waiting for {name}: {e}"));
                        Termination::Exited(SPAWN_FAILED_CODE)
                    }
                };
            }
        }
    };

    pump.abort();

    tracing::debug!(tool = %name, ?termination, "process finished");

    RunCompletion {
        termination,
        output: lines.join("\n"),
    }
}

/// Splits a byte stream into lines. Both `\n` and `\r` end a line so
/// carriage return progress updates arrive as they are written; blank lines
/// are skipped.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Lines completed by `bytes`.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' || b == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).to_string());
                    self.pending.clear();
                }
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Unterminated tail, if any.
    fn finish(self) -> Option<String> {
        (!self.pending.is_empty()).then(|| String::from_utf8_lossy(&self.pending).to_string())
    }
}

#[cfg(unix)]
fn start_pump(reader: std::io::PipeReader, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
    use std::os::fd::OwnedFd;

    match tokio::net::unix::pipe::Receiver::from_owned_fd(OwnedFd::from(reader)) {
        Ok(receiver) => tokio::spawn(pump(receiver, tx)),
        Err(e) => {
            tracing::debug!(error = %e, "cannot register output pipe");
            tokio::spawn(async {})
        }
    }
}

#[cfg(not(unix))]
fn start_pump(reader: std::io::PipeReader, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || pump_blocking(reader, tx))
}

/// Forward `reader` line by line until EOF or until the receiver is gone.
#[cfg_attr(not(unix), allow(dead_code))]
async fn pump<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::UnboundedSender<String>) {
    let mut splitter = LineSplitter::default();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "read failed");
                break;
            }
        };
        for line in splitter.push(&chunk[..n]) {
            if tx.send(line).is_err() {
                return;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        let _ = tx.send(line);
    }
}

#[cfg(not(unix))]
fn pump_blocking(mut reader: impl std::io::Read, tx: mpsc::UnboundedSender<String>) {
    let mut splitter = LineSplitter::default();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "read failed");
                break;
            }
        };
        for line in splitter.push(&chunk[..n]) {
            if tx.send(line).is_err() {
                return;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        let _ = tx.send(line);
    }
}
