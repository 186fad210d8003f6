//! Photo Importinator - move photos from a memory card to a photo server
//!
//! Backs up the card, converts RAW files to DNG, files everything into a
//! dated folder tree and keeps running per-day statistics.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use dialoguer::Confirm;
use photo_importinator::cli::{Command, ImportArgs};
use photo_importinator::tools::{self, consecutive, dayfolder, geo, video_rename};
use photo_importinator::{
    Cli, Config, ImportContext, ImportQueue, Job, RunningStats, Task, TaskStatus,
};
use regex::Regex;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colours and layout for terminal output

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colours
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    /// Print a separator line
    pub fn print_separator() {
        let _ = stdout().execute(Print(
            style(format!("{}\n", "─".repeat(70))).with(CliTheme::ACCENT),
        ));
    }

    /// Print text inside a box
    pub fn print_boxed(title: &str) {
        let width = 68;
        let len = title.chars().count().min(width);
        let left = (width - len) / 2;
        let right = width - len - left;

        let _ = stdout().execute(Print(
            style(format!("┌{}┐\n│", "─".repeat(width))).with(CliTheme::ACCENT),
        ));
        let _ = stdout().execute(Print(
            style(format!("{}{}{}", " ".repeat(left), title, " ".repeat(right)))
                .with(CliTheme::ERROR)
                .bold(),
        ));
        let _ = stdout().execute(Print(
            style(format!("│\n└{}┘\n", "─".repeat(width))).with(CliTheme::ACCENT),
        ));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a key/value pair
    pub fn print_key_value(key: &str, value: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print a statistic in its colour
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one processed file
    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(dest_or_msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print(style("  📁 Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

use cli_output::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::SampleConfig = cli.command {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    let log_path = get_log_path(&cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Importinator starting");

    let result = match &cli.command {
        Command::Import(args) => run_import(&cli, args),
        Command::Stats => run_stats(&cli),
        Command::SampleConfig => Ok(()),
        Command::Consecucheck { dir, pattern } => run_consecucheck(dir.as_deref(), pattern),
        Command::Dayfolderise { dir, dry_run } => {
            let dir = current_or(dir.as_deref())?;
            run_moves(dayfolder::plan(&dir)?, *dry_run)
        }
        Command::VideoRename { dir, dry_run } => {
            let dir = current_or(dir.as_deref())?;
            run_moves(video_rename::plan(&dir)?, *dry_run)
        }
        Command::GeoScoop { input, output } => run_geo_scoop(input, output),
    };

    if let Err(e) = &result {
        error!(error = %e, "Run failed");
        print_error(&format!("{:#}", e));
    }
    print_log_path(&log_path.display().to_string());
    result
}

/// Import photos from the camera card
fn run_import(cli: &Cli, args: &ImportArgs) -> Result<()> {
    let config_path = cli.config_path();
    info!(config_file = %config_path.display(), "Loading configuration");
    let config = Config::load_from_file(&config_path)?;

    let stats_path = config.running_stats_path(&config_path);
    let settings = config.resolve(&args.overrides(), stats_path.clone())?;
    let stats = RunningStats::load(&stats_path)?;
    let mut ctx = ImportContext::new(settings, stats);

    print_boxed("Photo Importinator");

    let mut queue = ImportQueue::new();
    queue.populate(&ctx);
    print_plan(&ctx, &queue);

    if ctx.settings.dry_run {
        print_warning("Dry run: nothing will be backed up, moved or converted");
    } else if !args.yes
        && !Confirm::new()
            .with_prompt("Proceed with backup and import?")
            .default(false)
            .interact()?
    {
        print_warning("Import cancelled, nothing was touched");
        info!("User cancelled import");
        return Ok(());
    }

    // Nothing on the card is touched until the backup is complete
    let mut backup = Task::backup(&ctx.settings);
    backup
        .execute(&ctx)
        .context("Backup failed, import aborted")?;
    print_backup(&backup);

    print_separator();
    queue.run_with_progress(&ctx, print_task)?;
    let report = queue.report(&mut ctx)?;

    print_separator();
    print_stat("Tasks", &report.total.to_string(), CliTheme::ACCENT);
    for (status, count) in &report.statuses {
        print_stat(&status.to_string(), &count.to_string(), status_color(*status));
    }
    print_blank();
    print_hint("Day summary:");
    for (day, count) in &report.days {
        print_key_value(&day.format("%Y-%m-%d").to_string(), &format!("{} images", count));
    }
    print_blank();
    print_hint("Running statistics for this session:");
    for (day, count) in ctx.stats.session() {
        print_key_value(
            &day.format("%Y-%m-%d").to_string(),
            &format!("{} images ({} all-time)", count, ctx.stats.day_count(*day)),
        );
    }

    let failed = report.count(TaskStatus::Failure);
    ctx.finish();
    if failed > 0 {
        print_error(&format!("{} files failed, see the log for details", failed));
    }
    Ok(())
}

fn print_plan(ctx: &ImportContext, queue: &ImportQueue) {
    let s = &ctx.settings;
    let camera = match &s.card_label {
        Some(label) => format!("{} ({})", s.camera, label),
        None => s.camera.clone(),
    };
    let conversions = queue.tasks().iter().filter(|t| t.needs_conversion()).count();

    print_key_value("Camera", &camera);
    print_key_value("Source", &s.source_path.display().to_string());
    print_key_value("Target", &format!("{} ({})", s.target_name, s.target_path.display()));
    print_key_value("Folders", s.folder_template.as_str());
    if s.skip_backup {
        print_key_value("Backup", "skipped");
    } else {
        print_key_value("Backup", &s.backup_archive().display().to_string());
    }
    print_key_value(
        "Files",
        &format!(
            "{} queued, {} to convert, {} ignored",
            queue.len(),
            conversions,
            queue.ignored()
        ),
    );
    for warning in queue.warnings() {
        print_warning(warning);
    }
    if s.skip_import {
        print_warning("Import phase will be skipped");
    }
    if s.leave_originals {
        print_hint("Originals are left on the card");
    }
}

fn print_backup(task: &Task) {
    let Job::Backup(job) = task.job() else {
        return;
    };
    match (task.status(), job.summary) {
        (TaskStatus::Done, Some(summary)) => print_result(
            "✓",
            CliTheme::SUCCESS,
            &job.archive.display().to_string(),
            &format!(
                "{} files, {} → {} ({:.1}%)",
                summary.file_count,
                human_size(summary.total_size),
                human_size(summary.archive_size),
                summary.compression_ratio() * 100.0
            ),
        ),
        _ => print_result(
            "⊘",
            CliTheme::WARNING,
            "Backup skipped",
            task.message().unwrap_or_default(),
        ),
    }
}

fn status_color(status: TaskStatus) -> crossterm::style::Color {
    match status {
        TaskStatus::Done => CliTheme::SUCCESS,
        TaskStatus::Skipped => CliTheme::WARNING,
        TaskStatus::Failure => CliTheme::ERROR,
        _ => CliTheme::HINT,
    }
}

fn print_task(index: usize, total: usize, task: &Task) {
    let icon = match task.status() {
        TaskStatus::Done => "✓",
        TaskStatus::Skipped => "⊘",
        TaskStatus::Failure => "✗",
        _ => "?",
    };
    let verb = if task.needs_conversion() { "⇒" } else { "→" };
    let mut detail = format!("{} {}", verb, task.destination().display());
    if let Some(message) = task.message() {
        detail.push_str(&format!(" ({})", message));
    }
    print_result(
        icon,
        status_color(task.status()),
        &format!("[{}/{}] {}", index, total, task.source().display()),
        &detail,
    );
}

fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

/// Show the all-time running statistics
fn run_stats(cli: &Cli) -> Result<()> {
    let config_path = cli.config_path();
    let config = Config::load_from_file(&config_path)?;
    let stats = RunningStats::load(config.running_stats_path(&config_path))?;

    print_hint(&format!("Running statistics from {}", stats.path().display()));
    let mut total = 0;
    for (day, count) in stats.list_all() {
        print_key_value(&day.format("%Y-%m-%d").to_string(), &format!("{} images", count));
        total += count;
    }
    print_stat("Total", &total.to_string(), CliTheme::ACCENT);
    Ok(())
}

fn current_or(dir: Option<&Path>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

fn run_consecucheck(dir: Option<&Path>, pattern: &str) -> Result<()> {
    let dir = current_or(dir)?;
    let pattern = Regex::new(pattern).context("Invalid file name pattern")?;
    if !dir.is_dir() {
        anyhow::bail!("Directory {} not found", dir.display());
    }

    match consecutive::check_directory(&dir, &pattern)? {
        None => print_warning("No filenames match."),
        Some(report) => {
            print_key_value("First found", &report.first.to_string());
            print_key_value("Last found", &report.last.to_string());
            print_hint("Sequences:");
            for (start, end) in &report.runs {
                print_result("-", CliTheme::ACCENT, &format!("{}-{}", start, end), "");
            }
            if report.missing() > 0 {
                print_warning(&format!("{} numbers missing", report.missing()));
            }
        }
    }
    Ok(())
}

fn run_moves(moves: Vec<tools::PlannedMove>, dry_run: bool) -> Result<()> {
    for planned in &moves {
        print_result(
            if dry_run { "~" } else { "→" },
            CliTheme::ACCENT,
            &planned.source.display().to_string(),
            &format!("=> {}", planned.destination.display()),
        );
    }
    if dry_run {
        print_warning("Dry run, nothing was moved");
        return Ok(());
    }
    tools::apply(&moves)?;
    Ok(())
}

fn run_geo_scoop(input: &Path, output: &Path) -> Result<()> {
    info!(input = %input.display(), output = %output.display(), "Scanning for geotagged photos");
    let scan = geo::scan(input);

    let file = File::create(output)
        .with_context(|| format!("Cannot create {}", output.display()))?;
    geo::write_kml(&scan.placemarks, BufWriter::new(file))?;

    print_stat("Placemarks", &scan.placemarks.len().to_string(), CliTheme::SUCCESS);
    print_stat("Skipped", &scan.skipped.to_string(), CliTheme::WARNING);
    print_key_value("Output", &output.display().to_string());
    Ok(())
}

/// Log file under the configuration folder, named after the camera or command
fn get_log_path(cli: &Cli) -> PathBuf {
    let config_path = cli.config_path();
    let log_dir = config_path
        .parent()
        .unwrap_or(Path::new("."))
        .join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("{}_{}.log", cli.log_name(), timestamp))
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // Progress goes to stdout; the console only gets problems unless verbose
    let console_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_level);

    let subscriber = tracing_subscriber::registry().with(env_filter).with(console);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .init();
    }

    Ok(guard)
}
