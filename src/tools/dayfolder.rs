//! Sort files into `YYYY-MM-DD` folders by modification date

use super::{PlannedMove, files_in};
use crate::error::Result;
use crate::metadata::modification_time;
use std::path::Path;
use tracing::warn;

/// Plan moving every file directly inside `dir` into its day folder
pub fn plan(dir: &Path) -> Result<Vec<PlannedMove>> {
    let mut moves = Vec::new();

    for source in files_in(dir)? {
        let Some(modified) = modification_time(&source) else {
            warn!(path = %source.display(), "No modification time, skipping");
            continue;
        };
        let Some(name) = source.file_name() else {
            continue;
        };

        let destination = dir
            .join(modified.format("%Y-%m-%d").to_string())
            .join(name);
        moves.push(PlannedMove {
            source,
            destination,
        });
    }

    Ok(moves)
}
