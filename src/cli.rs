use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trackmux_core::Container;

#[derive(Parser)]
#[command(name = "trackmux")]
#[command(author, version, about = "Inspect, extract, edit and mux media tracks")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a media file and list its tracks
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract tracks into separate files
    Extract {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,

        /// Track id to extract (repeatable)
        #[arg(short, long = "track", value_name = "ID")]
        tracks: Vec<u32>,

        /// Extract every track
        #[arg(long, conflicts_with = "tracks")]
        all: bool,

        /// Output directory (defaults to the source's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Remux a file keeping and relabelling selected tracks
    Edit {
        /// Source file
        #[arg(required = true)]
        file: PathBuf,

        /// Output file (defaults to <stem>_edited.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output container: mkv, mp4 or mov
        #[arg(long, default_value = "mkv")]
        format: Container,

        /// Track id to drop (repeatable)
        #[arg(long, value_name = "ID")]
        drop: Vec<u32>,

        /// Set a track's language
        #[arg(long, value_name = "ID:CODE", value_parser = parse_track_value)]
        language: Vec<(u32, String)>,

        /// Set a track's name
        #[arg(long, value_name = "ID:TEXT", value_parser = parse_track_value)]
        name: Vec<(u32, String)>,

        /// Make a track the default of its type
        #[arg(long, value_name = "ID")]
        default: Vec<u32>,

        /// Mark a track forced
        #[arg(long, value_name = "ID")]
        forced: Vec<u32>,

        /// Print the command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Add external subtitle files to a video
    Mux {
        /// Video file
        #[arg(required = true)]
        video: PathBuf,

        /// Subtitle files, in output track order
        #[arg(required = true)]
        subtitles: Vec<PathBuf>,

        /// Output file (defaults to <stem>_muxed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output container: mkv, mp4 or mov
        #[arg(long, default_value = "mkv")]
        format: Container,

        /// Print the command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Combine several inputs into one container
    Create {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// Output container: mkv, mp4 or mov
        #[arg(long, default_value = "mkv")]
        format: Container,

        /// Print the command without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Detect the language encoded in a filename
    DetectLanguage {
        filename: String,
    },

    /// Sanitize a filename
    Sanitize {
        name: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}

/// Parse `ID:VALUE`. The value may itself contain colons.
fn parse_track_value(s: &str) -> Result<(u32, String), String> {
    let (id, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected ID:VALUE, got '{s}'"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| format!("'{id}' is not a track id"))?;
    Ok((id, value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn track_value_parsing() {
        assert_eq!(parse_track_value("1:eng"), Ok((1, "eng".to_string())));
        assert_eq!(
            parse_track_value("2:Part 2: The Return"),
            Ok((2, "Part 2: The Return".to_string()))
        );
        assert_eq!(parse_track_value("3:"), Ok((3, String::new())));
        assert!(parse_track_value("eng").is_err());
        assert!(parse_track_value("x:eng").is_err());
    }

    #[test]
    fn edit_arguments() {
        let cli = Cli::try_parse_from([
            "trackmux", "edit", "movie.mkv", "--drop", "2", "--name", "1:Commentary", "--format", "mp4",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { drop, name, format, .. } => {
                assert_eq!(drop, [2]);
                assert_eq!(name, [(1, "Commentary".to_string())]);
                assert_eq!(format, Container::Mp4);
            }
            _ => panic!("expected edit"),
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["trackmux", "create", "a.h264", "-o", "x", "--format", "avi"]).is_err());
    }
}
