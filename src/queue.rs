//! The photo import queue
//!
//! Walks the source folders, creates one task per importable file in
//! discovery order, runs them one at a time and reports the results.
//! Tasks run sequentially: conversions and moves contend for the same
//! disks, and converter processes are not safe to fan out.

use crate::context::ImportContext;
use crate::error::Result;
use crate::metadata::{TimeSource, capture_time};
use crate::task::{Task, TaskStatus};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Status and day histograms over a queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub total: usize,
    pub statuses: BTreeMap<TaskStatus, usize>,
    pub days: BTreeMap<NaiveDate, usize>,
}

impl QueueReport {
    /// Number of tasks with the given status
    pub fn count(&self, status: TaskStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }
}

/// Ordered list of import tasks for one run
#[derive(Debug, Default)]
pub struct ImportQueue {
    tasks: Vec<Task>,
    warnings: Vec<String>,
    ignored: usize,
    reported: bool,
}

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Files skipped during discovery, with the reason
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Files left out because they are on the ignore list
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    /// Walk the source folders and queue a task for every importable file
    ///
    /// Unreadable entries and files without any usable date are skipped
    /// with a warning; they never abort the walk.
    pub fn populate(&mut self, ctx: &ImportContext) -> usize {
        let settings = &ctx.settings;
        let before = self.tasks.len();

        for folder in &settings.source_folders {
            if !folder.is_dir() {
                self.warn(format!("Source folder {} does not exist", folder.display()));
                continue;
            }
            info!(folder = %folder.display(), "Processing source path");

            for entry in WalkDir::new(folder).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        self.warn(format!("Cannot read directory entry: {}", e));
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.into_path();
                if settings.is_ignored(&path) {
                    debug!(?path, "Ignored");
                    self.ignored += 1;
                    continue;
                }

                let Some(time) = capture_time(ctx.reader(), &path) else {
                    self.warn(format!("No capture date for {}, skipping", path.display()));
                    continue;
                };
                if time.source == TimeSource::FileSystem {
                    debug!(?path, "Using modification time as capture date");
                }

                match Task::for_file(settings, path, time.timestamp.date()) {
                    Ok(task) => {
                        debug!(
                            source = %task.source().display(),
                            destination = %task.destination().display(),
                            file_type = task.file_type().unwrap_or_default(),
                            convert = task.needs_conversion(),
                            "Queued"
                        );
                        self.tasks.push(task);
                    }
                    Err(e) => self.warn(format!("Cannot queue file: {}", e)),
                }
            }
        }

        let added = self.tasks.len() - before;
        info!(queued = added, ignored = self.ignored, skipped = self.warnings.len(), "Queue populated");
        added
    }

    /// Execute every queued task in order
    pub fn run(&mut self, ctx: &ImportContext) -> Result<()> {
        self.run_with_progress(ctx, |_, _, _| {})
    }

    /// Execute every queued task in order, calling `progress` after each
    /// with the task's position, the queue length and the finished task
    pub fn run_with_progress<F>(&mut self, ctx: &ImportContext, mut progress: F) -> Result<()>
    where
        F: FnMut(usize, usize, &Task),
    {
        let total = self.tasks.len();
        for (index, task) in self.tasks.iter_mut().enumerate() {
            if task.status() != TaskStatus::Ready {
                continue;
            }
            task.execute(ctx)?;
            progress(index + 1, total, task);
        }
        Ok(())
    }

    /// Status and day histograms without touching the statistics store
    pub fn summarize(&self) -> QueueReport {
        let mut report = QueueReport {
            total: self.tasks.len(),
            ..Default::default()
        };
        for task in &self.tasks {
            *report.statuses.entry(task.status()).or_insert(0) += 1;
            if let Some(day) = task.capture_date() {
                *report.days.entry(day).or_insert(0) += 1;
            }
        }
        report
    }

    /// Summarize the run, count every dated task that ran and didn't fail
    /// in the running statistics and persist them
    ///
    /// Tasks skipped by a dry run or a skipped import phase never ran and
    /// are not counted. Statistics are counted only on the first call.
    pub fn report(&mut self, ctx: &mut ImportContext) -> Result<QueueReport> {
        let report = self.summarize();

        if !self.reported {
            for task in &self.tasks {
                if !task.ran() || task.status() == TaskStatus::Failure {
                    continue;
                }
                if let Some(day) = task.capture_date() {
                    ctx.stats.increment_day(day);
                }
            }
            self.reported = true;
        }

        ctx.save_stats()?;
        info!(
            total = report.total,
            done = report.count(TaskStatus::Done),
            skipped = report.count(TaskStatus::Skipped),
            failed = report.count(TaskStatus::Failure),
            "Import complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::RunningStats;
    use crate::testing::{FakeArchiver, FakeConverter, FakeReader, settings_for};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn context(dir: &TempDir, reader: FakeReader, dry_run: bool) -> ImportContext {
        let mut settings = settings_for(dir.path());
        settings.dry_run = dry_run;
        let stats = RunningStats::load(dir.path().join("stats.json")).unwrap();
        ImportContext::with_tools(
            settings,
            stats,
            Box::new(reader),
            Box::new(FakeConverter::succeeding()),
            Box::new(FakeArchiver),
        )
    }

    fn write_card(dir: &TempDir, names: &[&str]) {
        for name in names {
            let path = dir.path().join("card").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"data").unwrap();
        }
    }

    #[test]
    fn test_populate_in_discovery_order() {
        let dir = tempdir().unwrap();
        write_card(&dir, &["DCIM/IMG_0002.JPG", "DCIM/IMG_0001.JPG", "NC_FLLST.DAT"]);
        let reader = FakeReader::default()
            .with("IMG_0001.JPG", "2024-03-01 10:00:00")
            .with("IMG_0002.JPG", "2024-03-02 10:00:00");
        let ctx = context(&dir, reader, false);

        let mut queue = ImportQueue::new();
        assert_eq!(queue.populate(&ctx), 2);
        assert_eq!(queue.ignored(), 1);

        let names: Vec<_> = queue
            .tasks()
            .iter()
            .map(|t| t.source().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["IMG_0001.JPG", "IMG_0002.JPG"]);
        assert!(queue.tasks().iter().all(|t| t.status() == TaskStatus::Ready));
    }

    #[test]
    fn test_ignored_file_has_no_side_effects() {
        let dir = tempdir().unwrap();
        write_card(&dir, &["NC_FLLST.DAT"]);
        let mut ctx = context(&dir, FakeReader::default(), false);

        let mut queue = ImportQueue::new();
        queue.populate(&ctx);
        queue.run(&ctx).unwrap();
        let report = queue.report(&mut ctx).unwrap();

        assert!(queue.is_empty());
        assert_eq!(report.total, 0);
        assert!(dir.path().join("card/NC_FLLST.DAT").exists());
        assert!(!dir.path().join("target").exists());
    }

    #[test]
    fn test_missing_folder_is_a_warning() {
        let dir = tempdir().unwrap();
        let mut ctx = context(&dir, FakeReader::default(), false);
        ctx.settings.source_folders.push(dir.path().join("card/DCIM"));

        let mut queue = ImportQueue::new();
        assert_eq!(queue.populate(&ctx), 0);
        assert_eq!(queue.warnings().len(), 1);
    }

    #[test]
    fn test_undated_file_uses_modification_time() {
        let dir = tempdir().unwrap();
        write_card(&dir, &["clip.MOV"]);
        let ctx = context(&dir, FakeReader::default(), false);

        let mut queue = ImportQueue::new();
        assert_eq!(queue.populate(&ctx), 1);
        assert!(queue.tasks()[0].capture_date().is_some());
    }

    #[test]
    fn test_report_counts_and_stats() {
        let dir = tempdir().unwrap();
        write_card(&dir, &["IMG_0001.JPG", "IMG_0002.RAF", "IMG_0003.JPG"]);
        let reader = FakeReader::default()
            .with("IMG_0001.JPG", "2024-03-01 10:00:00")
            .with("IMG_0002.RAF", "2024-03-01 11:00:00")
            .with("IMG_0003.JPG", "2024-03-02 09:00:00");
        let mut ctx = context(&dir, reader, false);

        let mut queue = ImportQueue::new();
        queue.populate(&ctx);
        // Make one move fail
        fs::remove_file(dir.path().join("card/IMG_0003.JPG")).unwrap();
        queue.run(&ctx).unwrap();
        let report = queue.report(&mut ctx).unwrap();

        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(report.count(TaskStatus::Done), 2);
        assert_eq!(report.count(TaskStatus::Failure), 1);
        assert_eq!(report.days[&day1], 2);
        assert_eq!(report.days[&day2], 1);
        assert_eq!(ctx.stats.day_count(day1), 2);
        assert_eq!(ctx.stats.day_count(day2), 0);

        // Reporting again recomputes histograms without recounting
        queue.report(&mut ctx).unwrap();
        assert_eq!(ctx.stats.day_count(day1), 2);

        let saved = RunningStats::load(dir.path().join("stats.json")).unwrap();
        assert_eq!(saved.day_count(day1), 2);
    }

    #[test]
    fn test_same_name_from_two_folders() {
        let dir = tempdir().unwrap();
        for (name, content) in [
            ("DCIM/100NIKON/DSC_0001.JPG", "first photo"),
            ("DCIM/101NIKON/DSC_0001.JPG", "second photo"),
        ] {
            let path = dir.path().join("card").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let reader = FakeReader::default().with("DSC_0001.JPG", "2024-03-01 10:00:00");
        let mut ctx = context(&dir, reader, false);

        let mut queue = ImportQueue::new();
        assert_eq!(queue.populate(&ctx), 2);
        queue.run(&ctx).unwrap();
        let report = queue.report(&mut ctx).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(report.count(TaskStatus::Done), 1);
        assert_eq!(report.count(TaskStatus::Failure), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("target/2024/2024-03-01/DSC_0001.JPG")).unwrap(),
            "first photo"
        );
        assert!(dir.path().join("card/DCIM/101NIKON/DSC_0001.JPG").exists());
        assert_eq!(ctx.stats.day_count(day), 1);
    }

    #[test]
    fn test_skip_import_counts_nothing() {
        let dir = tempdir().unwrap();
        write_card(&dir, &["IMG_0001.JPG", "IMG_0002.RAF"]);
        let reader = FakeReader::default()
            .with("IMG_0001.JPG", "2024-03-01 10:00:00")
            .with("IMG_0002.RAF", "2024-03-01 11:00:00");
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        for _ in 0..3 {
            let mut ctx = context(&dir, reader.clone(), false);
            ctx.settings.skip_import = true;

            let mut queue = ImportQueue::new();
            queue.populate(&ctx);
            queue.run(&ctx).unwrap();
            let report = queue.report(&mut ctx).unwrap();

            assert_eq!(report.count(TaskStatus::Skipped), 2);
            assert_eq!(ctx.stats.day_count(day), 0);
        }

        assert!(!dir.path().join("target").exists());
        let saved = RunningStats::load(dir.path().join("stats.json")).unwrap();
        assert_eq!(saved.day_count(day), 0);
    }

    #[test]
    fn test_dry_run_report_does_not_persist() {
        let dir = tempdir().unwrap();
        write_card(&dir, &["IMG_0001.JPG"]);
        let reader = FakeReader::default().with("IMG_0001.JPG", "2024-03-01 10:00:00");
        let mut ctx = context(&dir, reader, true);

        let mut queue = ImportQueue::new();
        queue.populate(&ctx);
        let mut seen = 0;
        queue
            .run_with_progress(&ctx, |_, total, task| {
                seen += 1;
                assert_eq!(total, 1);
                assert_eq!(task.status(), TaskStatus::Skipped);
            })
            .unwrap();
        let report = queue.report(&mut ctx).unwrap();

        assert_eq!(seen, 1);
        assert_eq!(report.count(TaskStatus::Skipped), 1);
        assert!(dir.path().join("card/IMG_0001.JPG").exists());
        assert!(!dir.path().join("stats.json").exists());
    }
}
