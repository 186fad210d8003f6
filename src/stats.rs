//! Running statistics: images imported per calendar day
//!
//! The all-time counts are persisted as a single JSON object mapping
//! `YYYY-MM-DD` to a count. Session counts cover the current run only and
//! are never written to disk.
//!
//! There is no file locking. Only one importer may use a statistics file
//! at a time; concurrent runs will lose counts.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-day image counts, all-time and for the current session
#[derive(Debug, Clone)]
pub struct RunningStats {
    path: PathBuf,
    all_time: BTreeMap<NaiveDate, u64>,
    session: BTreeMap<NaiveDate, u64>,
}

impl RunningStats {
    /// Load statistics from `path`, starting empty if the file doesn't exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let all_time = if path.exists() {
            let file = File::open(&path)
                .map_err(|e| Error::StatsFile(format!("Failed to open {}: {}", path.display(), e)))?;
            let stats = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| Error::StatsFile(format!("Failed to parse {}: {}", path.display(), e)))?;
            debug!(path = %path.display(), "Running stats loaded");
            stats
        } else {
            debug!(path = %path.display(), "Running stats not found, will be stored when saved");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            all_time,
            session: BTreeMap::new(),
        })
    }

    /// File the statistics are saved to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count one more image for `day`, both all-time and in this session
    pub fn increment_day(&mut self, day: NaiveDate) {
        *self.all_time.entry(day).or_insert(0) += 1;
        *self.session.entry(day).or_insert(0) += 1;
    }

    /// All-time count for a day
    pub fn day_count(&self, day: NaiveDate) -> u64 {
        self.all_time.get(&day).copied().unwrap_or(0)
    }

    /// All-time counts in date order
    pub fn list_all(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.all_time.iter().map(|(d, c)| (*d, *c))
    }

    /// Counts added during this session, in date order
    pub fn session(&self) -> &BTreeMap<NaiveDate, u64> {
        &self.session
    }

    /// Images counted during this session
    pub fn session_total(&self) -> u64 {
        self.session.values().sum()
    }

    /// Persist the all-time counts, replacing the previous file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let file = File::create(&temp_path)
            .map_err(|e| Error::StatsFile(format!("Failed to create temp stats file: {}", e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.all_time)
            .map_err(|e| Error::StatsFile(format!("Failed to write stats file: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::StatsFile(format!("Failed to rename temp stats file: {}", e)))?;

        debug!(path = %self.path.display(), days = self.all_time.len(), "Running counts saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let dir = tempdir().unwrap();
        let stats = RunningStats::load(dir.path().join("stats.json")).unwrap();
        assert_eq!(stats.list_all().count(), 0);
        assert_eq!(stats.session_total(), 0);
    }

    #[test]
    fn test_increment_updates_both_views() {
        let dir = tempdir().unwrap();
        let mut stats = RunningStats::load(dir.path().join("stats.json")).unwrap();
        stats.increment_day(day(1));
        stats.increment_day(day(1));
        stats.increment_day(day(2));

        assert_eq!(stats.day_count(day(1)), 2);
        assert_eq!(stats.session()[&day(2)], 1);
        assert_eq!(stats.session_total(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/stats.json");

        let mut stats = RunningStats::load(&path).unwrap();
        stats.increment_day(day(1));
        stats.increment_day(day(5));
        stats.increment_day(day(5));
        stats.save().unwrap();

        let loaded = RunningStats::load(&path).unwrap();
        assert_eq!(
            loaded.list_all().collect::<Vec<_>>(),
            stats.list_all().collect::<Vec<_>>()
        );
        assert!(loaded.session().is_empty());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"2024-03-05\": 2"));
    }

    #[test]
    fn test_session_never_exceeds_all_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");

        let mut first = RunningStats::load(&path).unwrap();
        first.increment_day(day(1));
        first.save().unwrap();

        let mut second = RunningStats::load(&path).unwrap();
        second.increment_day(day(1));
        second.save().unwrap();

        for (d, count) in second.session() {
            assert!(*count <= second.day_count(*d));
        }
        assert_eq!(second.day_count(day(1)), 2);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(RunningStats::load(&path), Err(Error::StatsFile(_))));
    }
}
