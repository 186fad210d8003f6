//! Import tasks and their status tracking
//!
//! A task is one unit of work: moving or copying a file, converting a RAW
//! file to DNG, or backing up the card. Every task starts `Ready` and
//! ends in exactly one of `Done`, `Skipped` or `Failure`:
//!
//! ```text
//! Ready -> Running -> Done | Failure | Skipped (conversion target exists)
//! Ready -> Skipped                            (dry run, skipped phase)
//! ```

use crate::backup::BackupJob;
use crate::config::ImportSettings;
use crate::context::ImportContext;
use crate::error::{Error, Result};
use crate::transfer::{TransferMode, ensure_parent, transfer};
use chrono::{DateTime, Local, NaiveDate};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskStatus {
    #[default]
    Unknown,
    Ready,
    Running,
    Done,
    Skipped,
    Failure,
}

impl TaskStatus {
    /// Whether the task has finished, one way or another
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Skipped | TaskStatus::Failure)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Unknown => "unknown",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// A single image on its way from the card to the target
#[derive(Debug, Clone)]
pub struct FileJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub capture_date: Option<NaiveDate>,
    /// Normalised type tag, e.g. `JPEG` or `NEF`
    pub file_type: String,
}

/// What a task does
#[derive(Debug, Clone)]
pub enum Job {
    /// Move the file, or copy it when originals are left in place
    Move(FileJob),
    /// Convert the file to DNG at the destination
    Convert(FileJob),
    /// Archive the whole card
    Backup(BackupJob),
}

struct Outcome {
    status: TaskStatus,
    message: Option<String>,
}

impl Outcome {
    fn done() -> Self {
        Self {
            status: TaskStatus::Done,
            message: None,
        }
    }

    fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Skipped,
            message: Some(message.into()),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failure,
            message: Some(message.into()),
        }
    }
}

/// A job with its status and timing
#[derive(Debug, Clone)]
pub struct Task {
    job: Job,
    status: TaskStatus,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    elapsed: Option<Duration>,
    message: Option<String>,
    ran: bool,
}

impl Task {
    /// Create a task ready for execution
    pub fn new(job: Job) -> Self {
        Self {
            job,
            status: TaskStatus::Ready,
            started_at: None,
            finished_at: None,
            elapsed: None,
            message: None,
            ran: false,
        }
    }

    /// Classify a discovered file and resolve where it goes
    pub fn for_file(settings: &ImportSettings, source: PathBuf, capture_date: NaiveDate) -> Result<Self> {
        let (file_type, convert) = settings.classifier.classify(&source);
        let destination = settings.folder_template.resolve(
            capture_date,
            &settings.target_path,
            &source,
            convert,
        )?;

        let job = FileJob {
            source,
            destination,
            capture_date: Some(capture_date),
            file_type,
        };
        Ok(Self::new(if convert {
            Job::Convert(job)
        } else {
            Job::Move(job)
        }))
    }

    /// Card backup task for this run
    pub fn backup(settings: &ImportSettings) -> Self {
        Self::new(Job::Backup(BackupJob::new(
            settings.source_path.clone(),
            settings.backup_archive(),
        )))
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Detail recorded for skips and failures
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Whether the task got past the dry-run and phase checks and was run
    pub fn ran(&self) -> bool {
        self.ran
    }

    fn file_job(&self) -> Option<&FileJob> {
        match &self.job {
            Job::Move(job) | Job::Convert(job) => Some(job),
            Job::Backup(_) => None,
        }
    }

    pub fn source(&self) -> &Path {
        match &self.job {
            Job::Move(job) | Job::Convert(job) => &job.source,
            Job::Backup(job) => &job.source,
        }
    }

    pub fn destination(&self) -> &Path {
        match &self.job {
            Job::Move(job) | Job::Convert(job) => &job.destination,
            Job::Backup(job) => &job.archive,
        }
    }

    pub fn capture_date(&self) -> Option<NaiveDate> {
        self.file_job().and_then(|job| job.capture_date)
    }

    pub fn file_type(&self) -> Option<&str> {
        self.file_job().map(|job| job.file_type.as_str())
    }

    pub fn needs_conversion(&self) -> bool {
        matches!(self.job, Job::Convert(_))
    }

    fn should_skip(&self, settings: &ImportSettings) -> bool {
        match self.job {
            Job::Move(_) | Job::Convert(_) => settings.dry_run || settings.skip_import,
            Job::Backup(_) => settings.dry_run || settings.skip_backup,
        }
    }

    /// Run the task once
    ///
    /// File task failures are recorded on the task as `Failure` and do not
    /// return an error. A backup failure is also returned as `Err`, since
    /// the import must not continue without a backup.
    pub fn execute(&mut self, ctx: &ImportContext) -> Result<TaskStatus> {
        if self.status != TaskStatus::Ready {
            return Err(Error::TaskState(self.status));
        }

        let timer = Instant::now();
        self.started_at = Some(Local::now());

        let result = if self.should_skip(&ctx.settings) {
            info!(source = %self.source().display(), destination = %self.destination().display(), "Skipped");
            Ok(Outcome::skipped(if ctx.settings.dry_run {
                "dry run"
            } else {
                "phase skipped"
            }))
        } else {
            self.status = TaskStatus::Running;
            self.ran = true;
            match &mut self.job {
                Job::Move(job) => Ok(execute_move(job, &ctx.settings)),
                Job::Convert(job) => Ok(execute_convert(job, ctx)),
                Job::Backup(job) => job.run(ctx.archiver()).map(|summary| {
                    if summary.file_count == 0 {
                        Outcome::skipped("nothing to back up")
                    } else {
                        Outcome::done()
                    }
                }),
            }
        };

        self.finished_at = Some(Local::now());
        self.elapsed = Some(timer.elapsed());

        match result {
            Ok(outcome) => {
                self.status = outcome.status;
                self.message = outcome.message;
                Ok(self.status)
            }
            Err(e) => {
                error!(source = %self.source().display(), error = %e, "Task failed");
                self.status = TaskStatus::Failure;
                self.message = Some(e.to_string());
                Err(e)
            }
        }
    }
}

fn execute_move(job: &FileJob, settings: &ImportSettings) -> Outcome {
    // Same-named files from different card folders land on the same path
    if job.destination.exists() {
        error!(source = %job.source.display(), destination = %job.destination.display(), "Destination exists, not overwriting");
        return Outcome::failure("destination already exists");
    }

    let mode = if settings.leave_originals {
        TransferMode::Copy
    } else {
        TransferMode::Move
    };

    match transfer(&job.source, &job.destination, mode) {
        Ok(()) => {
            info!(source = %job.source.display(), destination = %job.destination.display(), ?mode, "Transferred");
            Outcome::done()
        }
        Err(e) => {
            error!(source = %job.source.display(), error = %e, "Transfer failed");
            Outcome::failure(e.to_string())
        }
    }
}

fn execute_convert(job: &FileJob, ctx: &ImportContext) -> Outcome {
    // Conversion is slow and destructive; never overwrite an existing DNG
    if job.destination.exists() {
        warn!(destination = %job.destination.display(), "Conversion target exists, skipping");
        return Outcome::skipped("destination already exists");
    }

    if let Err(e) = ensure_parent(&job.destination) {
        return Outcome::failure(e.to_string());
    }

    let output = match ctx.converter().convert(&job.source, &job.destination) {
        Ok(output) => output,
        Err(e) => {
            remove_partial(&job.destination);
            error!(source = %job.source.display(), error = %e, "Converter could not be run");
            return Outcome::failure(e.to_string());
        }
    };

    if !output.success {
        remove_partial(&job.destination);
        let code = output
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        error!(source = %job.source.display(), %code, stderr = %output.stderr.trim(), "Conversion failed");
        return Outcome::failure(format!("converter exited with {}", code));
    }

    if !output.confirms(&ctx.settings.converter.success_marker) {
        remove_partial(&job.destination);
        error!(source = %job.source.display(), stdout = %output.stdout.trim(), "Converter did not confirm conversion");
        return Outcome::failure("converter did not report a converted file");
    }

    info!(source = %job.source.display(), destination = %job.destination.display(), "Converted");

    if !ctx.settings.leave_originals
        && let Err(e) = fs::remove_file(&job.source)
    {
        warn!(source = %job.source.display(), error = %e, "Converted, but original not removed");
        return Outcome {
            status: TaskStatus::Done,
            message: Some(format!("original not removed: {}", e)),
        };
    }

    Outcome::done()
}

fn remove_partial(path: &Path) {
    if path.exists() {
        match fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "Removed partial conversion output"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeArchiver, FakeConverter, FakeReader, settings_for};
    use crate::stats::RunningStats;
    use std::rc::Rc;
    use std::cell::Cell;
    use tempfile::{TempDir, tempdir};

    fn context(dir: &TempDir, converter: FakeConverter, f: impl FnOnce(&mut ImportSettings)) -> ImportContext {
        let mut settings = settings_for(dir.path());
        f(&mut settings);
        let stats = RunningStats::load(dir.path().join("stats.json")).unwrap();
        ImportContext::with_tools(
            settings,
            stats,
            Box::new(FakeReader::default()),
            Box::new(converter),
            Box::new(FakeArchiver),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn card_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join("card").join(name);
        fs::write(&path, b"image data").unwrap();
        path
    }

    #[test]
    fn test_new_task_is_ready() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        let task = Task::for_file(&ctx.settings, card_file(&dir, "IMG_0001.JPG"), date()).unwrap();

        assert_eq!(task.status(), TaskStatus::Ready);
        assert_eq!(task.file_type(), Some("JPEG"));
        assert!(!task.needs_conversion());
        assert!(task.elapsed().is_none());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let calls = Rc::new(Cell::new(0));
        let converter = FakeConverter::succeeding().counting(calls.clone());
        let ctx = context(&dir, converter, |s| s.dry_run = true);

        for name in ["IMG_0001.JPG", "IMG_0002.RAF"] {
            let source = card_file(&dir, name);
            let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

            assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Skipped);
            assert!(source.exists());
            assert!(!task.destination().exists());
            assert!(task.elapsed().is_some());
            assert!(task.finished_at().is_some());
        }
        assert_eq!(calls.get(), 0);
        assert!(!dir.path().join("target").exists());
    }

    #[test]
    fn test_move_and_copy() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        let source = card_file(&dir, "IMG_0001.JPG");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Done);
        assert!(!source.exists());
        assert!(dir.path().join("target/2024/2024-03-01/IMG_0001.JPG").exists());

        let ctx = context(&dir, FakeConverter::succeeding(), |s| s.leave_originals = true);
        let source = card_file(&dir, "IMG_0003.JPG");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();
        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Done);
        assert!(source.exists());
        assert!(task.destination().exists());
    }

    #[test]
    fn test_move_never_overwrites() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        let source = card_file(&dir, "IMG_0001.JPG");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        fs::create_dir_all(task.destination().parent().unwrap()).unwrap();
        fs::write(task.destination(), b"already imported").unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Failure);
        assert_eq!(task.message(), Some("destination already exists"));
        assert!(task.ran());
        assert!(source.exists());
        assert_eq!(fs::read(task.destination()).unwrap(), b"already imported");
    }

    #[test]
    fn test_skip_import_leaves_files() {
        let dir = tempdir().unwrap();
        let calls = Rc::new(Cell::new(0));
        let converter = FakeConverter::succeeding().counting(calls.clone());
        let ctx = context(&dir, converter, |s| s.skip_import = true);

        for name in ["IMG_0001.JPG", "IMG_0002.RAF"] {
            let source = card_file(&dir, name);
            let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

            assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Skipped);
            assert_eq!(task.message(), Some("phase skipped"));
            assert!(!task.ran());
            assert!(source.exists());
        }
        assert_eq!(calls.get(), 0);
        assert!(!dir.path().join("target").exists());
    }

    #[test]
    fn test_move_failure_is_recorded() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        let source = card_file(&dir, "IMG_0001.JPG");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();
        fs::remove_file(&source).unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Failure);
        assert!(task.message().is_some());
    }

    #[test]
    fn test_execute_twice_is_error() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |s| s.dry_run = true);
        let mut task = Task::for_file(&ctx.settings, card_file(&dir, "a.jpg"), date()).unwrap();
        task.execute(&ctx).unwrap();

        assert!(matches!(task.execute(&ctx), Err(Error::TaskState(TaskStatus::Skipped))));
    }

    #[test]
    fn test_conversion_success_removes_original() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        let source = card_file(&dir, "IMG_0002.RAF");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        assert!(task.needs_conversion());
        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Done);
        assert!(!source.exists());
        assert!(dir.path().join("target/2024/2024-03-01/IMG_0002.DNG").exists());
    }

    #[test]
    fn test_conversion_leave_originals() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |s| s.leave_originals = true);
        let source = card_file(&dir, "IMG_0002.RAF");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Done);
        assert!(source.exists());
    }

    #[test]
    fn test_conversion_existing_target_skips() {
        let dir = tempdir().unwrap();
        let calls = Rc::new(Cell::new(0));
        let ctx = context(&dir, FakeConverter::succeeding().counting(calls.clone()), |_| {});
        let source = card_file(&dir, "IMG_0002.RAF");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        fs::create_dir_all(task.destination().parent().unwrap()).unwrap();
        fs::write(task.destination(), b"existing dng").unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Skipped);
        assert_eq!(calls.get(), 0);
        assert!(source.exists());
        assert_eq!(fs::read(task.destination()).unwrap(), b"existing dng");
    }

    #[test]
    fn test_conversion_nonzero_exit_cleans_up() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::exiting(2), |_| {});
        let source = card_file(&dir, "IMG_0002.RAF");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Failure);
        assert!(!task.destination().exists());
        assert!(source.exists());
    }

    #[test]
    fn test_conversion_missing_marker_cleans_up() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::silent(), |_| {});
        let source = card_file(&dir, "IMG_0002.RAF");
        let mut task = Task::for_file(&ctx.settings, source.clone(), date()).unwrap();

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Failure);
        assert!(!task.destination().exists());
        assert!(source.exists());
    }

    #[test]
    fn test_backup_task() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        card_file(&dir, "IMG_0001.JPG");
        let mut task = Task::backup(&ctx.settings);

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Done);
        assert!(task.destination().exists());
        match task.job() {
            Job::Backup(job) => assert_eq!(job.summary.unwrap().file_count, 1),
            other => panic!("unexpected job {:?}", other),
        }
    }

    #[test]
    fn test_backup_skipped() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |s| s.skip_backup = true);
        let mut task = Task::backup(&ctx.settings);

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Skipped);
        assert!(!task.destination().exists());
    }

    #[test]
    fn test_empty_card_backup_skipped() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |_| {});
        let mut task = Task::backup(&ctx.settings);

        assert_eq!(task.execute(&ctx).unwrap(), TaskStatus::Skipped);
        assert_eq!(task.message(), Some("nothing to back up"));
        assert!(!task.destination().exists());
    }

    #[test]
    fn test_backup_failure_propagates() {
        let dir = tempdir().unwrap();
        let ctx = context(&dir, FakeConverter::succeeding(), |s| {
            s.source_path = s.source_path.join("not-mounted");
        });
        let mut task = Task::backup(&ctx.settings);

        assert!(task.execute(&ctx).is_err());
        assert_eq!(task.status(), TaskStatus::Failure);
    }
}
