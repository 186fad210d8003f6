//! Card backup into a single 7-Zip archive
//!
//! The backup runs before anything on the card is moved or deleted. Every
//! file under the source is checked for readability first, so an
//! unreadable file stops the run instead of leaving a silently incomplete
//! archive behind.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Regular files found under a backup source
#[derive(Debug, Clone, Default)]
pub struct SourceInventory {
    /// Paths relative to the source root
    pub files: Vec<PathBuf>,
    /// Sum of file sizes in bytes
    pub total_size: u64,
}

/// Enumerate all regular files under `source`, failing on the first
/// file or directory that cannot be read
pub fn inventory(source: &Path) -> Result<SourceInventory> {
    let mut inventory = SourceInventory::default();

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let unreadable = |e: std::io::Error| Error::BackupUnreadable {
            path: path.to_path_buf(),
            source: e,
        };
        File::open(path).map_err(unreadable)?;
        let size = entry.metadata()?.len();

        inventory.total_size += size;
        inventory.files.push(
            path.strip_prefix(source)
                .unwrap_or(path)
                .to_path_buf(),
        );
    }

    debug!(
        files = inventory.files.len(),
        bytes = inventory.total_size,
        "Backup inventory complete"
    );
    Ok(inventory)
}

/// Writes a directory tree into a compressed archive
pub trait Archiver {
    /// Archive everything under `source` into `archive`, keeping paths relative to `source`
    fn archive(&self, source: &Path, archive: &Path) -> Result<()>;
}

/// Archiver running the 7-Zip command line tool
#[derive(Debug, Clone)]
pub struct SevenZip {
    program: PathBuf,
}

impl SevenZip {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Archiver for SevenZip {
    fn archive(&self, source: &Path, archive: &Path) -> Result<()> {
        // 7-Zip runs inside the source folder so stored paths stay relative
        let archive = std::path::absolute(archive)?;

        let output = Command::new(&self.program)
            .current_dir(source)
            .args(["a", "-t7z", "-y"])
            .arg(&archive)
            .arg("*")
            .output()
            .map_err(|e| Error::Process {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(Error::Backup(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Result of a completed backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupSummary {
    pub file_count: usize,
    /// Total uncompressed size in bytes
    pub total_size: u64,
    /// Size of the finished archive in bytes
    pub archive_size: u64,
}

impl BackupSummary {
    /// Archive size as a fraction of the uncompressed size
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            return 1.0;
        }
        self.archive_size as f64 / self.total_size as f64
    }
}

/// Backup of one card into `{camera}_{date}.7z`
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub source: PathBuf,
    pub archive: PathBuf,
    pub summary: Option<BackupSummary>,
}

impl BackupJob {
    pub fn new(source: PathBuf, archive: PathBuf) -> Self {
        Self {
            source,
            archive,
            summary: None,
        }
    }

    /// Inventory the source, write the archive and record its statistics
    pub fn run(&mut self, archiver: &dyn Archiver) -> Result<BackupSummary> {
        info!(source = %self.source.display(), archive = %self.archive.display(), "Start backup");

        let inventory = inventory(&self.source)?;

        if inventory.files.is_empty() {
            info!(source = %self.source.display(), "Source is empty, nothing to back up");
            let summary = BackupSummary {
                file_count: 0,
                total_size: 0,
                archive_size: 0,
            };
            self.summary = Some(summary);
            return Ok(summary);
        }

        if let Some(parent) = self.archive.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Never append to an earlier archive from the same day
        let archive = unused_archive_path(&self.archive);
        if archive != self.archive {
            info!(existing = %self.archive.display(), archive = %archive.display(), "Archive exists, writing a new one");
            self.archive = archive;
        }
        archiver.archive(&self.source, &self.archive)?;

        let archive_size = fs::metadata(&self.archive)
            .map_err(|e| Error::Backup(format!("archive {} missing: {}", self.archive.display(), e)))?
            .len();

        let summary = BackupSummary {
            file_count: inventory.files.len(),
            total_size: inventory.total_size,
            archive_size,
        };
        info!(
            files = summary.file_count,
            total_size = summary.total_size,
            archive_size = summary.archive_size,
            ratio = format!("{:.1}%", summary.compression_ratio() * 100.0),
            "Backup complete"
        );

        self.summary = Some(summary);
        Ok(summary)
    }
}

/// `archive` itself if it is free, else the first of `name_2.7z`, `name_3.7z`, ... that is
fn unused_archive_path(archive: &Path) -> PathBuf {
    if !archive.exists() {
        return archive.to_path_buf();
    }

    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = archive
        .extension()
        .map(|e| e.to_string_lossy().into_owned());

    (2u32..)
        .map(|n| {
            archive.with_file_name(match &extension {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            })
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| archive.to_path_buf())
}
