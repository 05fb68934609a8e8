//! Command synthesis: turn a [`TrackModel`] snapshot into the exact argument
//! vector for mkvmerge, mkvextract or ffmpeg.
//!
//! Nothing here executes anything. Edits and muxes go through mkvmerge only
//! when the source was probed by mkvmerge and the output is matroska; track
//! ids from ffprobe are stream indexes and are only handed to ffmpeg.
//! Extraction picks its tool from the source's [`ProbeDialect`].
//!
//! Arguments are passed to the tool as a vector, never through a shell.
//! Relative paths starting with `-` are prefixed with `./` so a filename
//! can never be read as an option.

mod matroska;
mod transcode;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use trackmux_core::config::MuxConfig;
use trackmux_core::sanitize::{anchored, is_safe};
use trackmux_core::{
    Container, Error, ExternalSubtitle, MediaFile, ProbeDialect, Result, TrackModel,
};

use crate::command::{path_arg, ToolCommand};
use crate::tools::{Tool, ToolRegistry};

/// Argument accumulator.
#[derive(Debug, Default)]
pub(crate) struct ArgList(Vec<String>);

impl ArgList {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    fn extend<I: IntoIterator<Item = &'static str>>(&mut self, args: I) {
        self.0.extend(args.into_iter().map(String::from));
    }

    fn push_path(&mut self, path: &Path) {
        self.0.push(path_arg(path));
    }
}

/// A synthesized invocation: the resolved executable plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPlan {
    pub tool: Tool,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandPlan {
    pub fn to_command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program);
        cmd.args(self.args.iter().cloned());
        cmd
    }

    /// Program followed by arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandPlan {
    /// Shell-quoted rendering for logs and dry runs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.argv().iter().map(|a| shell_quote(a)).collect();
        f.write_str(&quoted.join(" "))
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_./:=,+-@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Knobs that change synthesized arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// ffmpeg subtitle codec for non-matroska outputs.
    pub text_subtitle_codec: String,
    /// Emit user forced flags instead of always clearing them.
    pub preserve_forced: bool,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self::from(&MuxConfig::default())
    }
}

impl From<&MuxConfig> for SynthesisOptions {
    fn from(cfg: &MuxConfig) -> Self {
        Self {
            text_subtitle_codec: cfg.text_subtitle_codec.clone(),
            preserve_forced: cfg.preserve_forced,
        }
    }
}

/// Builds [`CommandPlan`]s.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    tools: ToolRegistry,
    options: SynthesisOptions,
}

impl Synthesizer {
    pub fn new(tools: ToolRegistry, options: SynthesisOptions) -> Self {
        Self { tools, options }
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Subtitle codec for an ffmpeg write into `container`.
    fn subtitle_codec(&self, container: Container) -> &str {
        transcode::subtitle_codec(container, &self.options.text_subtitle_codec)
    }

    fn plan(&self, tool: Tool, args: ArgList) -> Result<CommandPlan> {
        Ok(CommandPlan {
            tool,
            program: self.tools.require(tool)?.to_path_buf(),
            args: args.0,
        })
    }

    /// Remux the loaded file keeping only selected tracks, with their edited
    /// metadata.
    pub fn edit(&self, model: &TrackModel, output: &Path, container: Container) -> Result<CommandPlan> {
        let media = loaded(model)?;
        check_output(output, [media.path.as_path()])?;

        let groups = model.grouped_keep_ids();
        if groups.is_empty() {
            return Err(Error::precondition("no tracks selected to keep"));
        }

        let mut args = ArgList::new();
        match (media.dialect, container.is_matroska()) {
            (ProbeDialect::Matroska, true) => {
                args.push("-o");
                args.push_path(output);
                matroska::push_keep_filters(&mut args, &groups);
                matroska::push_track_options(&mut args, model, self.options.preserve_forced);
                args.push_path(&media.path);
                self.plan(Tool::Mkvmerge, args)
            }
            _ => {
                args.extend(["-y", "-i"]);
                args.push_path(&media.path);
                let mapped = push_base_maps(&mut args, model);
                transcode::push_codecs(&mut args, self.subtitle_codec(container));
                push_base_metadata(&mut args, model, mapped);
                args.push_path(output);
                self.plan(Tool::Ffmpeg, args)
            }
        }
    }

    /// Extract every selected track into `output_dir`, one file per track.
    ///
    /// Matroska sources use mkvextract; anything else uses one ffmpeg
    /// invocation with an output per track.
    pub fn extract(&self, model: &TrackModel, output_dir: &Path) -> Result<CommandPlan> {
        let media = loaded(model)?;
        let kept = model.kept_tracks();
        if kept.is_empty() {
            return Err(Error::precondition("no tracks selected for extraction"));
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(kept.len());
        for (track, edit) in kept {
            let name = if edit.output_filename.is_empty() {
                format!("track_{}.dat", track.id)
            } else {
                edit.output_filename.clone()
            };
            let path = anchored(output_dir, &name);
            if !seen.insert(path.clone()) {
                return Err(Error::precondition(format!(
                    "two tracks would be written to {}",
                    path.display()
                )));
            }
            targets.push((track.id, path));
        }

        let mut args = ArgList::new();
        match media.dialect {
            ProbeDialect::Matroska => {
                args.push_path(&media.path);
                args.push("tracks");
                for (id, path) in &targets {
                    args.push(format!("{id}:{}", path.to_string_lossy()));
                }
                self.plan(Tool::Mkvextract, args)
            }
            ProbeDialect::Generic => {
                args.extend(["-y", "-i"]);
                args.push_path(&media.path);
                for (id, path) in &targets {
                    args.push("-map");
                    args.push(format!("0:{id}"));
                    args.extend(["-c", "copy"]);
                    args.push_path(path);
                }
                self.plan(Tool::Ffmpeg, args)
            }
        }
    }

    /// Add external subtitle files to the loaded video. The base file's
    /// keep-filters and track options apply as in [`Synthesizer::edit`].
    pub fn mux_subtitles(
        &self,
        model: &TrackModel,
        subtitles: &[ExternalSubtitle],
        output: &Path,
        container: Container,
    ) -> Result<CommandPlan> {
        let media = loaded(model)?;
        let inputs = std::iter::once(media.path.as_path()).chain(subtitles.iter().map(|s| s.path.as_path()));
        check_output(output, inputs)?;

        let groups = model.grouped_keep_ids();
        if groups.is_empty() && subtitles.is_empty() {
            return Err(Error::precondition("no tracks kept and no subtitles to add"));
        }

        let preserve_forced = self.options.preserve_forced;
        let mut args = ArgList::new();
        match (media.dialect, container.is_matroska()) {
            (ProbeDialect::Matroska, true) => {
                args.push("-o");
                args.push_path(output);
                matroska::push_keep_filters(&mut args, &groups);
                matroska::push_track_options(&mut args, model, preserve_forced);
                args.push_path(&media.path);
                for sub in subtitles {
                    matroska::push_subtitle_block(&mut args, sub, preserve_forced);
                }
                self.plan(Tool::Mkvmerge, args)
            }
            _ => {
                args.extend(["-y", "-i"]);
                args.push_path(&media.path);
                for sub in subtitles {
                    args.push("-i");
                    args.push_path(&sub.path);
                }
                let mapped = push_base_maps(&mut args, model);
                for n in 1..=subtitles.len() {
                    args.push("-map");
                    args.push(format!("{n}:0"));
                }
                transcode::push_codecs(&mut args, self.subtitle_codec(container));
                push_base_metadata(&mut args, model, mapped);
                for (i, sub) in subtitles.iter().enumerate() {
                    transcode::push_stream_metadata(
                        &mut args,
                        mapped + i,
                        &sub.language_code,
                        &sub.track_name,
                        sub.is_default,
                    );
                }
                args.push_path(output);
                self.plan(Tool::Ffmpeg, args)
            }
        }
    }

    /// Combine heterogeneous inputs into one container.
    pub fn create(&self, inputs: &[PathBuf], output: &Path, container: Container) -> Result<CommandPlan> {
        if inputs.is_empty() {
            return Err(Error::precondition("no input files"));
        }
        check_output(output, inputs.iter().map(PathBuf::as_path))?;

        let mut args = ArgList::new();
        if container.is_matroska() {
            args.push("-o");
            args.push_path(output);
            for input in inputs {
                args.push_path(input);
            }
            self.plan(Tool::Mkvmerge, args)
        } else {
            args.push("-y");
            for input in inputs {
                args.push("-i");
                args.push_path(input);
            }
            for i in 0..inputs.len() {
                args.push("-map");
                args.push(i.to_string());
            }
            transcode::push_codecs(&mut args, self.subtitle_codec(container));
            args.push_path(output);
            self.plan(Tool::Ffmpeg, args)
        }
    }
}

fn loaded(model: &TrackModel) -> Result<&MediaFile> {
    model
        .media()
        .ok_or_else(|| Error::precondition("no media file loaded"))
}

/// The output must name a file and must not clobber an input.
fn check_output<'a>(output: &Path, inputs: impl IntoIterator<Item = &'a Path>) -> Result<()> {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_safe(&name) {
        return Err(Error::Validation(format!(
            "'{}' is not a valid output file",
            output.display()
        )));
    }
    if inputs.into_iter().any(|input| input == output) {
        return Err(Error::precondition(format!(
            "output {} would overwrite an input",
            output.display()
        )));
    }
    Ok(())
}

/// `-map 0:ID` for every kept track, grouped video, audio, subtitle.
/// Returns how many streams were mapped.
fn push_base_maps(args: &mut ArgList, model: &TrackModel) -> usize {
    let groups = model.grouped_keep_ids();
    let mut mapped = 0;
    for id in groups.all() {
        args.push("-map");
        args.push(format!("0:{id}"));
        mapped += 1;
    }
    mapped
}

/// Metadata for the first `mapped` output streams, in map order.
fn push_base_metadata(args: &mut ArgList, model: &TrackModel, mapped: usize) {
    let groups = model.grouped_keep_ids();
    for (index, id) in groups.all().enumerate().take(mapped) {
        if let Some(edit) = model.edit(id) {
            transcode::push_stream_metadata(args, index, &edit.language, &edit.name, edit.is_default);
        }
    }
}
