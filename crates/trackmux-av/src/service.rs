//! Orchestration: probe, synthesize, run, and interpret the exit status.
//!
//! The service never stores callbacks. Progress sinks and cancellation
//! tokens are passed in per call.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use trackmux_core::config::Config;
use trackmux_core::{
    Container, EditContext, Error, ExternalSubtitle, MediaFile, Result, TrackModel,
};

use crate::command::{RunCompletion, Termination};
use crate::plan::{CommandPlan, SynthesisOptions, Synthesizer};
use crate::probe::ProbeAdapter;
use crate::tools::{ExitConvention, Tool, ToolRegistry};

/// Interpreted result of one tool run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// The output exists; the text is advisory and shown verbatim.
    SuccessWithWarnings(String),
    Failed {
        message: String,
        /// The process never started.
        spawn_failed: bool,
    },
    Cancelled,
}

impl Outcome {
    /// Success with or without warnings.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::SuccessWithWarnings(_))
    }

    /// Convert a failure into the matching [`Error`]. Warnings are returned
    /// as `Ok(Some(..))`.
    pub fn into_result(self, tool: Tool, code: i32) -> Result<Option<String>> {
        match self {
            Outcome::Success => Ok(None),
            Outcome::SuccessWithWarnings(w) => Ok(Some(w)),
            Outcome::Failed {
                message,
                spawn_failed: true,
            } => Err(Error::spawn_failed(tool.name(), message)),
            Outcome::Failed { message, .. } => Err(Error::exit_non_zero(tool.name(), code, message)),
            Outcome::Cancelled => Err(Error::exit_non_zero(tool.name(), code, "cancelled")),
        }
    }
}

/// Classify a finished run according to `tool`'s exit code convention.
///
/// MKVToolNix: 0 success, 1 success with the tool's output as warnings, 2
/// and up failure. Everything else: zero or failure. Warnings and failure
/// messages carry the merged output in the order it was written, which holds
/// stderr when the tool wrote any and stdout otherwise.
pub fn classify(tool: Tool, completion: &RunCompletion) -> Outcome {
    let code = match completion.termination {
        Termination::Exited(code) => code,
        Termination::SpawnFailed => {
            return Outcome::Failed {
                message: completion.output.clone(),
                spawn_failed: true,
            }
        }
        Termination::Cancelled => return Outcome::Cancelled,
        Termination::TimedOut(d) => {
            return Outcome::Failed {
                message: format!("{tool} timed out after {}s", d.as_secs()),
                spawn_failed: false,
            }
        }
    };

    match (tool.exit_convention(), code) {
        (_, 0) => Outcome::Success,
        (ExitConvention::Graded, 1) => Outcome::SuccessWithWarnings(completion.output.clone()),
        _ => Outcome::Failed {
            message: completion.output.clone(),
            spawn_failed: false,
        },
    }
}

/// Lifecycle of the single in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Running,
    Finished(Outcome),
}

/// At most one operation runs at a time; a second start is rejected.
#[derive(Debug, Default)]
pub struct OperationSlot {
    state: Mutex<OperationState>,
}

impl OperationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OperationState {
        self.state.lock().clone()
    }

    /// Move to `Running`.
    ///
    /// # Errors
    ///
    /// [`Error::SynthesisPrecondition`] if an operation is already running.
    pub fn begin(&self) -> Result<SlotGuard<'_>> {
        let mut state = self.state.lock();
        if *state == OperationState::Running {
            return Err(Error::precondition("another operation is already running"));
        }
        *state = OperationState::Running;
        Ok(SlotGuard {
            slot: self,
            finished: false,
        })
    }
}

/// Held while an operation runs. Dropping it without [`SlotGuard::finish`]
/// returns the slot to `Idle`.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    slot: &'a OperationSlot,
    finished: bool,
}

impl SlotGuard<'_> {
    pub fn finish(mut self, outcome: Outcome) {
        *self.slot.state.lock() = OperationState::Finished(outcome);
        self.finished = true;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.slot.state.lock() = OperationState::Idle;
        }
    }
}

/// Ties the registry, prober, synthesizer and runner together per use case.
#[derive(Debug)]
pub struct MediaService {
    tools: ToolRegistry,
    prober: Arc<ProbeAdapter>,
    synth: Synthesizer,
    default_language: String,
    timeout: Option<Duration>,
    slot: OperationSlot,
}

impl MediaService {
    /// Discover tools and build every component from `config`.
    pub fn from_config(config: &Config) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        let prober = ProbeAdapter::from_registry(&tools).cached(config.probe.cache);
        Self::with_parts(
            tools,
            prober,
            SynthesisOptions::from(&config.mux),
            config.mux.default_language.clone(),
        )
    }

    pub fn with_parts(
        tools: ToolRegistry,
        prober: ProbeAdapter,
        options: SynthesisOptions,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            synth: Synthesizer::new(tools.clone(), options),
            tools,
            prober: Arc::new(prober),
            default_language: default_language.into(),
            timeout: None,
            slot: OperationSlot::new(),
        }
    }

    /// Kill any tool run that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn state(&self) -> OperationState {
        self.slot.state()
    }

    /// Probe on the blocking pool.
    pub async fn probe(&self, path: &Path) -> Result<MediaFile> {
        let prober = Arc::clone(&self.prober);
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || prober.probe(&path))
            .await
            .map_err(|e| Error::probe_failed("probe", e.to_string()))?
    }

    /// Probe `path` and seed a fresh [`TrackModel`] for `context`.
    pub async fn load(&self, path: &Path, context: EditContext) -> Result<TrackModel> {
        let media = self.probe(path).await?;
        for track in &media.tracks {
            tracing::debug!(id = track.id, kind = %track.kind, codec = %track.codec, "track");
        }
        let mut model = TrackModel::with_default_language(context, self.default_language.clone());
        model.load(media);
        Ok(model)
    }

    /// Run `plan`, streaming each output line to `on_line`.
    ///
    /// Triggering `cancel` kills the child and yields
    /// [`Outcome::Cancelled`]. Dropping the returned future also kills the
    /// child.
    ///
    /// # Errors
    ///
    /// Only if another operation is already running. Tool failures are
    /// reported as [`Outcome::Failed`].
    pub async fn execute(
        &self,
        plan: &CommandPlan,
        cancel: &CancellationToken,
        on_line: impl FnMut(&str),
    ) -> Result<Outcome> {
        let guard = self.slot.begin()?;
        tracing::info!(tool = %plan.tool, command = %plan, "running");

        let mut command = plan.to_command();
        if let Some(t) = self.timeout {
            command.timeout(t);
        }
        // Kills the child if this future is dropped before the run ends.
        let run_token = cancel.child_token();
        let _kill_on_drop = run_token.clone().drop_guard();
        let completion = command.spawn_with_cancel(run_token).wait_with(on_line).await;

        let outcome = classify(plan.tool, &completion);
        match &outcome {
            Outcome::Success => tracing::info!(tool = %plan.tool, "finished"),
            Outcome::SuccessWithWarnings(w) => {
                tracing::warn!(tool = %plan.tool, warnings = %w.trim(), "finished with warnings")
            }
            Outcome::Failed { message, spawn_failed } => tracing::info!(
                tool = %plan.tool,
                code = completion.code(),
                spawn_failed,
                message = %message.trim(),
                "failed"
            ),
            Outcome::Cancelled => tracing::info!(tool = %plan.tool, "cancelled"),
        }

        guard.finish(outcome.clone());
        Ok(outcome)
    }

    /// Extract the selected tracks into `out_dir`, creating it if needed.
    pub async fn extract(
        &self,
        model: &TrackModel,
        out_dir: &Path,
        cancel: &CancellationToken,
        on_line: impl FnMut(&str),
    ) -> Result<Outcome> {
        let plan = self.synth.extract(model, out_dir)?;
        tokio::fs::create_dir_all(out_dir).await?;
        self.execute(&plan, cancel, on_line).await
    }

    pub async fn edit(
        &self,
        model: &TrackModel,
        output: &Path,
        container: Container,
        cancel: &CancellationToken,
        on_line: impl FnMut(&str),
    ) -> Result<Outcome> {
        let plan = self.synth.edit(model, output, container)?;
        self.execute(&plan, cancel, on_line).await
    }

    pub async fn mux(
        &self,
        model: &TrackModel,
        subtitles: &[ExternalSubtitle],
        output: &Path,
        container: Container,
        cancel: &CancellationToken,
        on_line: impl FnMut(&str),
    ) -> Result<Outcome> {
        let plan = self.synth.mux_subtitles(model, subtitles, output, container)?;
        self.execute(&plan, cancel, on_line).await
    }

    pub async fn create(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        container: Container,
        cancel: &CancellationToken,
        on_line: impl FnMut(&str),
    ) -> Result<Outcome> {
        let plan = self.synth.create(inputs, output, container)?;
        self.execute(&plan, cancel, on_line).await
    }
}
