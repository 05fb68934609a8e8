//! # trackmux-av
//!
//! Everything in trackmux that touches an external process.
//!
//! - **Tool discovery** ([`ToolRegistry`]): resolve mkvmerge, mkvextract,
//!   ffmpeg and ffprobe from config overrides, `PATH` or the managed
//!   install directory.
//! - **Process runner** ([`ToolCommand`]): synchronous capture for probes,
//!   streamed async runs with cancellation and timeouts for everything else.
//! - **Probing** ([`ProbeAdapter`]): mkvmerge `-J` for matroska files,
//!   ffprobe for the rest, with an optional result cache.
//! - **Command synthesis** ([`Synthesizer`]): track model in, [`CommandPlan`]
//!   out.
//! - **Orchestration** ([`MediaService`]): run a plan and classify the exit
//!   status into an [`Outcome`].

pub mod command;
pub mod plan;
pub mod probe;
pub mod service;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{RunCompletion, RunHandle, Termination, ToolCommand, ToolOutput};
pub use plan::{CommandPlan, SynthesisOptions, Synthesizer};
pub use probe::{FfprobeProber, MkvmergeProber, ProbeAdapter, ProbeCache, Prober};
pub use service::{classify, MediaService, OperationSlot, OperationState, Outcome};
pub use tools::{ExitConvention, Tool, ToolInfo, ToolRegistry};
