mod cli;

use trackmux::config;
use trackmux_av::{CommandPlan, MediaService, Outcome, ToolRegistry};
use trackmux_core::language::{self, Language};
use trackmux_core::naming::default_output_path;
use trackmux_core::sanitize::{is_safe, sanitize};
use trackmux_core::{Container, EditContext, MediaFile, SubtitleList, TrackModel};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "trackmux=debug,trackmux_core=debug,trackmux_av=trace".to_string()
        } else {
            "trackmux=info,trackmux_core=info,trackmux_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Probe { file, json } => block_on(probe_file(config_path, &file, json)),
        Commands::Extract {
            file,
            tracks,
            all,
            out_dir,
            dry_run,
        } => block_on(extract(config_path, &file, &tracks, all, out_dir, dry_run)),
        Commands::Edit {
            file,
            output,
            format,
            drop,
            language,
            name,
            default,
            forced,
            dry_run,
        } => {
            let edits = TrackEdits {
                drop,
                language,
                name,
                default,
                forced,
            };
            block_on(edit(config_path, &file, output, format, edits, dry_run))
        }
        Commands::Mux {
            video,
            subtitles,
            output,
            format,
            dry_run,
        } => block_on(mux(config_path, &video, &subtitles, output, format, dry_run)),
        Commands::Create {
            inputs,
            output,
            format,
            dry_run,
        } => block_on(create(config_path, &inputs, &output, format, dry_run)),
        Commands::DetectLanguage { filename } => Ok(detect_language(&filename)),
        Commands::Sanitize { name } => {
            println!("{}", sanitize(&name));
            println!("safe: {}", is_safe(&name));
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

fn block_on<F: std::future::Future<Output = Result<ExitCode>>>(f: F) -> Result<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(f)
}

fn load_service(config_path: Option<&Path>) -> Result<MediaService> {
    let config = config::load_config_or_default(config_path)?;
    Ok(MediaService::from_config(&config))
}

fn fallback_language(service: &MediaService) -> Language {
    language::lookup(service.default_language()).unwrap_or(language::ENGLISH)
}

/// Dry run, or execute with Ctrl-C wired to cancellation.
async fn run_plan(service: &MediaService, plan: &CommandPlan, dry_run: bool) -> Result<ExitCode> {
    if dry_run {
        println!("[DRY RUN] {plan}");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = service
        .execute(plan, &cancel, |line| eprintln!("{line}"))
        .await?;
    ctrl_c.abort();

    Ok(report(&outcome))
}

fn report(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Success => {
            println!("Done.");
            ExitCode::SUCCESS
        }
        Outcome::SuccessWithWarnings(warnings) => {
            println!("Done with warnings:");
            println!("{}", warnings.trim_end());
            ExitCode::SUCCESS
        }
        Outcome::Failed { message, .. } => {
            println!("Failed: {}", message.trim_end());
            ExitCode::FAILURE
        }
        Outcome::Cancelled => {
            println!("Cancelled.");
            ExitCode::FAILURE
        }
    }
}

fn require_track(model: &TrackModel, id: u32) -> Result<()> {
    if model.edit(id).is_none() {
        anyhow::bail!("No track with id {id}");
    }
    Ok(())
}

async fn probe_file(config_path: Option<&Path>, file: &Path, json: bool) -> Result<ExitCode> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let service = load_service(config_path)?;
    let media = service.probe(file).await?;

    if json {
        let json_str = serde_json::to_string_pretty(&media)?;
        println!("{}", json_str);
    } else {
        print_media(&media);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_media(media: &MediaFile) {
    println!("File: {}", media.path.display());
    println!("Dialect: {}", media.dialect);
    if let Some(ref duration) = media.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }

    println!("\nTracks: {}", media.tracks.len());
    for track in &media.tracks {
        print!("  [{}] {} {} ({})", track.id, track.kind, track.codec, track.language);
        if let Some(ref name) = track.name {
            print!(" \"{}\"", name);
        }
        if track.default_track {
            print!(" [default]");
        }
        if track.forced_track {
            print!(" [forced]");
        }
        println!();
    }
}

async fn extract(
    config_path: Option<&Path>,
    file: &Path,
    tracks: &[u32],
    all: bool,
    out_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<ExitCode> {
    let service = load_service(config_path)?;
    let mut model = service.load(file, EditContext::Extract).await?;

    if all {
        model.set_all_keep(true);
    } else {
        for &id in tracks {
            require_track(&model, id)?;
            model.set_keep(id, true);
        }
    }

    let out_dir = out_dir.unwrap_or_else(|| {
        file.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let plan = service.synthesizer().extract(&model, &out_dir)?;
    if !dry_run {
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;
    }
    run_plan(&service, &plan, dry_run).await
}

/// Track edits requested on the command line.
struct TrackEdits {
    drop: Vec<u32>,
    language: Vec<(u32, String)>,
    name: Vec<(u32, String)>,
    default: Vec<u32>,
    forced: Vec<u32>,
}

impl TrackEdits {
    fn apply(self, model: &mut TrackModel) -> Result<()> {
        for id in self.drop {
            require_track(model, id)?;
            model.set_keep(id, false);
        }
        for (id, code) in self.language {
            require_track(model, id)?;
            // Accept aliases like "en" or "pt-BR" and store the canonical code.
            let code = language::lookup(&code).map_or(code, |l| l.code.to_string());
            model.set_language(id, code);
        }
        for (id, name) in self.name {
            require_track(model, id)?;
            model.set_name(id, name);
        }
        for id in self.default {
            require_track(model, id)?;
            model.set_default(id, true);
        }
        for id in self.forced {
            require_track(model, id)?;
            model.set_forced(id, true);
        }
        Ok(())
    }
}

async fn edit(
    config_path: Option<&Path>,
    file: &Path,
    output: Option<PathBuf>,
    format: Container,
    edits: TrackEdits,
    dry_run: bool,
) -> Result<ExitCode> {
    let service = load_service(config_path)?;
    let mut model = service.load(file, EditContext::Edit).await?;
    edits.apply(&mut model)?;

    let output = output.unwrap_or_else(|| default_output_path(file, "_edited", format));
    let plan = service.synthesizer().edit(&model, &output, format)?;
    run_plan(&service, &plan, dry_run).await
}

async fn mux(
    config_path: Option<&Path>,
    video: &Path,
    subtitles: &[PathBuf],
    output: Option<PathBuf>,
    format: Container,
    dry_run: bool,
) -> Result<ExitCode> {
    let service = load_service(config_path)?;
    let model = service.load(video, EditContext::Edit).await?;

    let fallback = fallback_language(&service);
    let mut list = SubtitleList::new();
    for path in subtitles {
        list.add_path(path, fallback);
    }
    for sub in list.as_slice() {
        tracing::debug!(
            file = %sub.file_name(),
            language = %sub.language_code,
            default = sub.is_default,
            forced = sub.is_forced,
            "subtitle"
        );
    }

    let output = output.unwrap_or_else(|| default_output_path(video, "_muxed", format));
    let plan = service
        .synthesizer()
        .mux_subtitles(&model, list.as_slice(), &output, format)?;
    run_plan(&service, &plan, dry_run).await
}

async fn create(
    config_path: Option<&Path>,
    inputs: &[PathBuf],
    output: &Path,
    format: Container,
    dry_run: bool,
) -> Result<ExitCode> {
    let service = load_service(config_path)?;
    let plan = service.synthesizer().create(inputs, output, format)?;
    run_plan(&service, &plan, dry_run).await
}

fn detect_language(filename: &str) -> ExitCode {
    match language::detect(filename) {
        Some(lang) => {
            println!("{} {}", lang.code, lang.label);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("no language detected");
            ExitCode::FAILURE
        }
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<ExitCode> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.tool);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        if !tool.available {
            print!(" - {}", trackmux_core::error::remediation_hint(tool.tool.name()));
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(ExitCode::SUCCESS)
}

fn validate_config(path: Option<&Path>) -> Result<ExitCode> {
    let found = path.map(Path::to_path_buf).or_else(config::find_default_config);

    let config = match found {
        Some(ref p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Subtitle codec: {}", config.mux.text_subtitle_codec);
    println!("  Preserve forced: {}", config.mux.preserve_forced);
    println!("  Default language: {}", config.mux.default_language);
    println!("  Probe cache: {}", config.probe.cache);
    println!("  Managed tools: {}", config.tools.managed_dir.display());

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    Ok(ExitCode::SUCCESS)
}
