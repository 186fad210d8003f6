//! Error types for the photo importer

use crate::task::TaskStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for importer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo importer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Running statistics file error: {0}")]
    StatsFile(String),

    #[error("Failed to run {program}: {source}")]
    Process {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Cannot read {path} for backup: {source}")]
    BackupUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task cannot be executed from status {0}")]
    TaskState(TaskStatus),

    #[error("Invalid file name: {path}")]
    FileName { path: PathBuf },

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}
