//! Append the recording time to video file names
//!
//! `HDV_0001.MP4` becomes `HDV_0001_20240301_120000.MP4`, using the file
//! modification time.

use super::{PlannedMove, files_in};
use crate::error::Result;
use crate::metadata::modification_time;
use std::path::Path;
use tracing::warn;

/// Video extensions handled, compared case-insensitively
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
}

/// Plan renames for the videos directly inside `dir`
///
/// Files whose new name is already taken are left alone.
pub fn plan(dir: &Path) -> Result<Vec<PlannedMove>> {
    let mut moves = Vec::new();

    for source in files_in(dir)?.into_iter().filter(|p| is_video(p)) {
        let Some(modified) = modification_time(&source) else {
            warn!(path = %source.display(), "No modification time, skipping");
            continue;
        };
        let (Some(stem), Some(ext)) = (
            source.file_stem().and_then(|s| s.to_str()),
            source.extension().and_then(|e| e.to_str()),
        ) else {
            continue;
        };

        let name = format!("{}_{}.{}", stem, modified.format("%Y%m%d_%H%M%S"), ext);
        let destination = source.with_file_name(name);
        if destination.exists() {
            warn!(path = %destination.display(), "Already exists, skipping");
            continue;
        }
        moves.push(PlannedMove {
            source,
            destination,
        });
    }

    Ok(moves)
}
