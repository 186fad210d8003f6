//! Configuration types for the photo importer

use crate::classify::FileClassifier;
use crate::destination::FolderTemplate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name under the platform config directory
pub const APP_DIR: &str = "photo_importinator";

/// Configuration file name
pub const CONFIG_FILENAME: &str = "photo_importinator_config.toml";

/// Running statistics file name, stored next to the configuration file
pub const STATS_FILENAME: &str = "running_stats.json";

/// Default success marker printed by the DNG converter
pub const DEFAULT_SUCCESS_MARKER: &str = "Converted 1/1 files";

/// RAW-to-DNG converter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Converter executable
    pub path: PathBuf,

    /// Extra flags passed between `convert` and the file arguments
    pub flags: Vec<String>,

    /// Substring the converter prints to stdout when exactly one file was converted
    pub success_marker: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dnglab"),
            flags: vec![],
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
        }
    }
}

/// A destination photo server or folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Root of the dated folder tree
    pub path: PathBuf,

    /// Folder structure template with `{year}`, `{month}` and `{day}` fields
    #[serde(default = "default_folder_structure")]
    pub folder_structure: String,
}

fn default_folder_structure() -> String {
    FolderTemplate::DEFAULT.to_string()
}

/// Camera specific details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Memory card mount point or cloud sync folder
    pub card: Option<PathBuf>,

    /// Human readable card name, shown in the import plan
    pub card_label: Option<String>,

    /// Subfolders of the card to import from (empty = whole card)
    pub folders: Vec<PathBuf>,

    /// Exact file names that are never imported
    pub ignore: Vec<String>,

    /// Extensions (with leading dot) that are converted to DNG
    pub convert_raw: Vec<String>,

    /// Copy instead of move, and keep RAW files after conversion
    pub leave_originals: bool,
}

/// Photo importer configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target used when none is given on the command line
    pub default_target: Option<String>,

    /// Camera used when none is given on the command line
    pub default_camera: Option<String>,

    /// Folder receiving the card backup archives
    pub backup_path: Option<PathBuf>,

    /// 7-Zip executable used for backups
    pub sevenzip: Option<PathBuf>,

    /// Running statistics file (default: next to the configuration file)
    pub running_stats: Option<PathBuf>,

    pub converter: ConverterConfig,

    pub targets: BTreeMap<String, TargetConfig>,

    pub cameras: BTreeMap<String, CameraConfig>,
}

/// Per-run overrides, usually from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub camera: Option<String>,
    pub target: Option<String>,
    pub card: Option<PathBuf>,
    pub date: Option<NaiveDate>,
    pub skip_backup: bool,
    pub skip_import: bool,
    pub dry_run: bool,
    pub leave_originals: bool,
}

/// Fully resolved settings for one import run
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub camera: String,
    pub card_label: Option<String>,
    /// Root of the card; this is what gets backed up
    pub source_path: PathBuf,
    /// Folders walked by the import queue
    pub source_folders: Vec<PathBuf>,
    pub target_name: String,
    pub target_path: PathBuf,
    pub folder_template: FolderTemplate,
    pub backup_path: PathBuf,
    pub sevenzip_path: PathBuf,
    pub ignore: HashSet<String>,
    pub classifier: FileClassifier,
    pub converter: ConverterConfig,
    pub stats_path: PathBuf,
    /// Date stamp used in the backup archive name
    pub date: NaiveDate,
    pub skip_backup: bool,
    pub skip_import: bool,
    pub dry_run: bool,
    pub leave_originals: bool,
}

impl ImportSettings {
    /// Date stamp formatted for file names
    pub fn date_to_filename(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Backup archive path: `{camera}_{date}.7z` under the backup folder
    pub fn backup_archive(&self) -> PathBuf {
        self.backup_path
            .join(format!("{}_{}.7z", self.camera, self.date_to_filename()))
    }

    /// Check whether a file name is on the camera's ignore list
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| self.ignore.contains(n))
    }
}

impl Config {
    /// Default configuration file location for this platform
    pub fn default_path() -> PathBuf {
        dirs::config_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(CONFIG_FILENAME)
    }

    /// Running statistics path, relative to the configuration file unless set
    pub fn running_stats_path(&self, config_path: &Path) -> PathBuf {
        self.running_stats.clone().unwrap_or_else(|| {
            config_path
                .parent()
                .unwrap_or(Path::new("."))
                .join(STATS_FILENAME)
        })
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolve the camera and target for this run into import settings
    ///
    /// All configuration errors surface here, before any file is touched.
    pub fn resolve(
        &self,
        overrides: &Overrides,
        stats_path: PathBuf,
    ) -> Result<ImportSettings, ConfigError> {
        let camera_name = overrides
            .camera
            .clone()
            .or_else(|| self.default_camera.clone())
            .or_else(|| {
                if self.cameras.len() == 1 {
                    self.cameras.keys().next().cloned()
                } else {
                    None
                }
            })
            .ok_or(ConfigError::NoCamera)?;
        let camera = self
            .cameras
            .get(&camera_name)
            .ok_or_else(|| ConfigError::UnknownCamera(camera_name.clone()))?;

        let target_name = overrides
            .target
            .clone()
            .or_else(|| self.default_target.clone())
            .ok_or(ConfigError::NoTarget)?;
        let target = self
            .targets
            .get(&target_name)
            .ok_or_else(|| ConfigError::UnknownTarget(target_name.clone()))?;

        let source_path = overrides
            .card
            .clone()
            .or_else(|| camera.card.clone())
            .ok_or_else(|| ConfigError::NoCard(camera_name.clone()))?;
        if !source_path.is_dir() {
            return Err(ConfigError::MissingSource(source_path));
        }

        let source_folders = if camera.folders.is_empty() {
            vec![source_path.clone()]
        } else {
            camera.folders.iter().map(|f| source_path.join(f)).collect()
        };

        let skip_backup = overrides.skip_backup;
        let backup_path = match &self.backup_path {
            Some(path) => path.clone(),
            None if skip_backup || overrides.dry_run => PathBuf::new(),
            None => return Err(ConfigError::NoBackupPath),
        };

        Ok(ImportSettings {
            camera: camera_name,
            card_label: camera.card_label.clone(),
            source_path,
            source_folders,
            target_name,
            target_path: target.path.clone(),
            folder_template: FolderTemplate::parse(&target.folder_structure)?,
            backup_path,
            sevenzip_path: self.sevenzip.clone().unwrap_or_else(|| PathBuf::from("7z")),
            ignore: camera.ignore.iter().cloned().collect(),
            classifier: FileClassifier::new(camera.convert_raw.iter().cloned()),
            converter: self.converter.clone(),
            stats_path,
            date: overrides
                .date
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
            skip_backup,
            skip_import: overrides.skip_import,
            dry_run: overrides.dry_run,
            leave_originals: overrides.leave_originals || camera.leave_originals,
        })
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Importinator configuration file
# This file uses TOML format (https://toml.io)

# Target and camera used when none is given on the command line
default_target = "server"
default_camera = "z6"

# Folder receiving {camera}_{date}.7z card backups
backup_path = "D:/PhotoBackups"

# 7-Zip executable used for the backups
sevenzip = "7z"

# Running statistics file (default: running_stats.json next to this file)
# running_stats = "D:/PhotoBackups/running_stats.json"

[converter]
# RAW-to-DNG converter, invoked as: <path> convert [flags...] <source> <destination>
path = "dnglab"
flags = ["--compression", "lossless"]
# Text the converter prints when exactly one file was converted
success_marker = "Converted 1/1 files"

[targets.server]
path = "//server/photos"
# Fields: {year}, {month}, {day}; {month:02} pads to two digits
folder_structure = "{year}/{year}-{month:02}-{day:02}"

[cameras.z6]
card = "E:/"
card_label = "NIKON Z 6"
# Import only these folders under the card (default: everything)
folders = ["DCIM"]
# Exact file names never imported
ignore = ["NC_FLLST.DAT"]
# Extensions converted to DNG (with leading dot, uppercase)
convert_raw = [".NEF"]
# Copy instead of move, keep RAW files after conversion
leave_originals = false
"#
        .to_string()
    }
}

/// Errors that can occur when loading or resolving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// No camera given and no default configured
    NoCamera,
    /// Camera not present in the configuration
    UnknownCamera(String),
    /// No target given and no default configured
    NoTarget,
    /// Target not present in the configuration
    UnknownTarget(String),
    /// Camera has no card path and none was given
    NoCard(String),
    /// Card or source folder does not exist
    MissingSource(PathBuf),
    /// Backups are enabled but no backup folder is configured
    NoBackupPath,
    /// Folder structure template could not be parsed
    Template { template: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::NoCamera => {
                write!(f, "No camera specified and no default_camera configured")
            }
            ConfigError::UnknownCamera(name) => {
                write!(f, "Camera '{}' is not configured", name)
            }
            ConfigError::NoTarget => {
                write!(f, "No target specified and no default_target configured")
            }
            ConfigError::UnknownTarget(name) => {
                write!(f, "Target '{}' is not configured", name)
            }
            ConfigError::NoCard(camera) => {
                write!(f, "No card path configured for camera '{}'", camera)
            }
            ConfigError::MissingSource(path) => {
                write!(f, "Source folder '{}' does not exist", path.display())
            }
            ConfigError::NoBackupPath => {
                write!(f, "No backup_path configured (use --skip-backup to import without one)")
            }
            ConfigError::Template { template, message } => {
                write!(f, "Malformed folder template '{}': {}", template, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            _ => None,
        }
    }
}
