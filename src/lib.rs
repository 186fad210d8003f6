//! Photo Importinator - move photos from a memory card to a photo server
//!
//! This library provides the import pipeline:
//! - Backing up the whole card into a 7-Zip archive
//! - Reading capture dates from EXIF metadata
//! - Resolving dated destination folders from a template
//! - Moving, copying or converting RAW files to DNG via an external converter
//! - Running per-day image statistics persisted across runs
//!
//! plus a few single-pass folder utilities in [`tools`].

pub mod backup;
pub mod classify;
pub mod cli;
pub mod config;
pub mod context;
pub mod convert;
pub mod destination;
pub mod error;
pub mod metadata;
pub mod queue;
pub mod stats;
pub mod task;
pub mod tools;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use backup::{Archiver, BackupSummary, SevenZip};
pub use classify::FileClassifier;
pub use cli::Cli;
pub use config::{Config, ConfigError, ImportSettings, Overrides};
pub use context::ImportContext;
pub use convert::{Converter, ConverterOutput, DngConverter};
pub use destination::FolderTemplate;
pub use error::{Error, Result};
pub use metadata::{ExifReader, MetadataReader};
pub use queue::{ImportQueue, QueueReport};
pub use stats::RunningStats;
pub use task::{Job, Task, TaskStatus};
