//! CLI argument parsing with clap

use crate::config::{Config, Overrides};
use crate::tools::consecutive::DEFAULT_PATTERN;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Photo Importinator - move or convert photos from an SD card or cloud
/// folder to your photo server
#[derive(Parser, Debug)]
#[command(name = "photo-importinator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    #[arg(short = 'C', long, global = true, env = "PHOTO_IMPORTINATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Back up the card, then move and convert its photos to the target
    Import(ImportArgs),

    /// Show the all-time per-day image counts
    Stats,

    /// Print a sample configuration file
    SampleConfig,

    /// Check that camera file numbers in a folder are consecutive
    Consecucheck {
        /// Folder to check (default: current directory)
        dir: Option<PathBuf>,

        /// File name pattern; the first capture group is the file number
        #[arg(short, long, default_value = DEFAULT_PATTERN)]
        pattern: String,
    },

    /// Move files into YYYY-MM-DD folders by modification date
    Dayfolderise {
        /// Folder to sort (default: current directory)
        dir: Option<PathBuf>,

        /// Show what would be moved without moving
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Append the modification timestamp to video file names
    VideoRename {
        /// Folder with the videos (default: current directory)
        dir: Option<PathBuf>,

        /// Show what would be renamed without renaming
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Export geotagged photos as KML
    GeoScoop {
        /// Folder to scan
        #[arg(short, long, default_value = ".")]
        input: PathBuf,

        /// KML file to write
        #[arg(short, long, default_value = "output.kml")]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    /// Camera name (default: as set in config)
    pub camera: Option<String>,

    /// Target device (default: as set in config)
    #[arg(short = 'T', long)]
    pub target: Option<String>,

    /// Card path (default: as per camera settings in config)
    #[arg(short, long)]
    pub card: Option<PathBuf>,

    /// Archive date stamp, YYYY-mm-dd (default: current date)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Skip the backup phase
    #[arg(long)]
    pub skip_backup: bool,

    /// Skip the final import phase
    #[arg(long)]
    pub skip_import: bool,

    /// Do nothing, except explain what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Copy instead of move, and keep RAW files after conversion
    #[arg(long)]
    pub leave_originals: bool,

    /// Don't ask for confirmation before importing
    #[arg(short, long)]
    pub yes: bool,
}

impl ImportArgs {
    /// Per-run overrides for configuration resolution
    pub fn overrides(&self) -> Overrides {
        Overrides {
            camera: self.camera.clone(),
            target: self.target.clone(),
            card: self.card.clone(),
            date: self.date,
            skip_backup: self.skip_backup,
            skip_import: self.skip_import,
            dry_run: self.dry_run,
            leave_originals: self.leave_originals,
        }
    }
}

impl Cli {
    /// Configuration file in use
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Name used for the log file
    pub fn log_name(&self) -> String {
        match &self.command {
            Command::Import(args) => args.camera.clone().unwrap_or_else(|| "import".into()),
            Command::Stats => "stats".into(),
            Command::SampleConfig => "sample-config".into(),
            Command::Consecucheck { .. } => "consecucheck".into(),
            Command::Dayfolderise { .. } => "dayfolderise".into(),
            Command::VideoRename { .. } => "video-rename".into(),
            Command::GeoScoop { .. } => "geo-scoop".into(),
        }
    }
}
