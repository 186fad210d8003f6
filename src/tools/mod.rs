//! Small single-pass photo folder utilities
//!
//! - [`consecutive`]: report gaps in camera file numbering
//! - [`dayfolder`]: sort files into day folders by modification date
//! - [`video_rename`]: append a timestamp to video file names
//! - [`geo`]: export geotagged photos as a KML document

pub mod consecutive;
pub mod dayfolder;
pub mod geo;
pub mod video_rename;

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A rename or move the tools would perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Regular files directly inside `dir`, sorted by name
pub(crate) fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Perform planned moves in order, stopping at the first failure
pub fn apply(moves: &[PlannedMove]) -> Result<()> {
    for planned in moves {
        crate::transfer::transfer(
            &planned.source,
            &planned.destination,
            crate::transfer::TransferMode::Move,
        )?;
        tracing::info!(
            source = %planned.source.display(),
            destination = %planned.destination.display(),
            "Moved"
        );
    }
    Ok(())
}
