//! Test doubles for the external tools

use crate::backup::Archiver;
use crate::classify::FileClassifier;
use crate::config::{ConverterConfig, ImportSettings};
use crate::convert::{Converter, ConverterOutput};
use crate::destination::FolderTemplate;
use crate::error::Result;
use crate::metadata::MetadataReader;
use chrono::{NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Settings for a card at `root/card` importing into `root/target`,
/// converting `.RAF` files
pub fn settings_for(root: &Path) -> ImportSettings {
    let card = root.join("card");
    fs::create_dir_all(&card).unwrap();

    ImportSettings {
        camera: "x100".into(),
        card_label: None,
        source_path: card.clone(),
        source_folders: vec![card],
        target_name: "nas".into(),
        target_path: root.join("target"),
        folder_template: FolderTemplate::parse(FolderTemplate::DEFAULT).unwrap(),
        backup_path: root.join("backups"),
        sevenzip_path: PathBuf::from("7z"),
        ignore: ["NC_FLLST.DAT".to_string()].into_iter().collect(),
        classifier: FileClassifier::new([".RAF"]),
        converter: ConverterConfig::default(),
        stats_path: root.join("stats.json"),
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        skip_backup: false,
        skip_import: false,
        dry_run: false,
        leave_originals: false,
    }
}

/// Capture dates keyed by file name
#[derive(Default, Clone)]
pub struct FakeReader {
    pub dates: HashMap<String, NaiveDateTime>,
}

impl FakeReader {
    pub fn with(mut self, name: &str, date: &str) -> Self {
        let date = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S").unwrap();
        self.dates.insert(name.to_string(), date);
        self
    }
}

impl MetadataReader for FakeReader {
    fn read_capture_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let name = path.file_name()?.to_str()?;
        self.dates.get(name).copied()
    }
}

/// Converter that writes a placeholder DNG and reports a fixed result
pub struct FakeConverter {
    output: ConverterOutput,
    calls: Rc<Cell<usize>>,
}

impl FakeConverter {
    fn new(success: bool, code: i32, stdout: &str) -> Self {
        Self {
            output: ConverterOutput {
                success,
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(true, 0, "Converted 1/1 files")
    }

    /// Exits zero without printing the success marker
    pub fn silent() -> Self {
        Self::new(true, 0, "")
    }

    pub fn exiting(code: i32) -> Self {
        Self::new(false, code, "")
    }

    pub fn counting(mut self, calls: Rc<Cell<usize>>) -> Self {
        self.calls = calls;
        self
    }
}

impl Converter for FakeConverter {
    fn convert(&self, _source: &Path, destination: &Path) -> Result<ConverterOutput> {
        self.calls.set(self.calls.get() + 1);
        // Leave a partial file behind even on failure
        fs::write(destination, b"dng")?;
        Ok(self.output.clone())
    }
}

/// Archiver writing a small placeholder archive
pub struct FakeArchiver;

impl Archiver for FakeArchiver {
    fn archive(&self, _source: &Path, archive: &Path) -> Result<()> {
        fs::write(archive, b"7z")?;
        Ok(())
    }
}
