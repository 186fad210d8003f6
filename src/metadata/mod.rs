//! Capture date and location extraction
//!
//! Reading metadata is a capability the import queue consumes through the
//! [`MetadataReader`] trait. Failures never raise: an unreadable file
//! yields `None`, and the caller decides whether to fall back to the file
//! modification time or to skip the file.

pub mod exif;

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::debug;

pub use self::exif::{ExifReader, GeoTag};

/// Source of a file's capture date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Embedded EXIF metadata
    Exif,
    /// File system modification time
    FileSystem,
}

/// Capture date with its origin
#[derive(Debug, Clone, Copy)]
pub struct CaptureTime {
    pub timestamp: NaiveDateTime,
    pub source: TimeSource,
}

/// Reads the capture timestamp embedded in an image file
pub trait MetadataReader {
    /// Capture timestamp, or `None` if the file carries no readable date
    fn read_capture_date(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Read a capture date, falling back to the file modification time
///
/// Returns `None` only if neither the metadata nor the file system can
/// provide a timestamp.
pub fn capture_time(reader: &dyn MetadataReader, path: &Path) -> Option<CaptureTime> {
    if let Some(timestamp) = reader.read_capture_date(path) {
        return Some(CaptureTime {
            timestamp,
            source: TimeSource::Exif,
        });
    }

    debug!(?path, "No embedded capture date, using modification time");
    modification_time(path).map(|timestamp| CaptureTime {
        timestamp,
        source: TimeSource::FileSystem,
    })
}

/// File modification time in local time
pub fn modification_time(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let datetime: DateTime<Local> = modified.into();
    Some(datetime.naive_local())
}
