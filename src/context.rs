//! Per-run import context
//!
//! Holds everything a run needs: the resolved settings, the running
//! statistics store and the external tools. It is built once at the start
//! of a run, lent to the backup, queue and tasks, and released by
//! [`ImportContext::finish`] once the statistics are saved.

use crate::backup::{Archiver, SevenZip};
use crate::config::ImportSettings;
use crate::convert::{Converter, DngConverter};
use crate::error::Result;
use crate::metadata::{ExifReader, MetadataReader};
use crate::stats::RunningStats;
use tracing::info;

pub struct ImportContext {
    pub settings: ImportSettings,
    pub stats: RunningStats,
    reader: Box<dyn MetadataReader>,
    converter: Box<dyn Converter>,
    archiver: Box<dyn Archiver>,
}

impl ImportContext {
    /// Context using EXIF metadata, the configured DNG converter and 7-Zip
    pub fn new(settings: ImportSettings, stats: RunningStats) -> Self {
        let converter = DngConverter::new(&settings.converter);
        let archiver = SevenZip::new(settings.sevenzip_path.clone());
        Self::with_tools(
            settings,
            stats,
            Box::new(ExifReader),
            Box::new(converter),
            Box::new(archiver),
        )
    }

    /// Context with explicitly supplied external tools
    pub fn with_tools(
        settings: ImportSettings,
        stats: RunningStats,
        reader: Box<dyn MetadataReader>,
        converter: Box<dyn Converter>,
        archiver: Box<dyn Archiver>,
    ) -> Self {
        Self {
            settings,
            stats,
            reader,
            converter,
            archiver,
        }
    }

    pub fn reader(&self) -> &dyn MetadataReader {
        self.reader.as_ref()
    }

    pub fn converter(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    pub fn archiver(&self) -> &dyn Archiver {
        self.archiver.as_ref()
    }

    /// Persist the running statistics unless this is a dry run
    pub fn save_stats(&self) -> Result<()> {
        if self.settings.dry_run {
            info!("Dry run, running statistics not saved");
            return Ok(());
        }
        self.stats.save()
    }

    /// End the run, releasing the tools and handing back the statistics
    pub fn finish(self) -> RunningStats {
        self.stats
    }
}
