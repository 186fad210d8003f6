//! File move and copy primitives

use crate::error::Result;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// How a file reaches its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Leave the original in place
    Copy,
    /// Remove the original once the destination is written
    Move,
}

/// Ensure a destination file's parent directory exists
pub fn ensure_parent(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
        debug!(directory = %parent.display(), "Created directory");
    }
    Ok(())
}

/// Copy or move `source` to `dest`, creating missing directories
pub fn transfer(source: &Path, dest: &Path, mode: TransferMode) -> Result<()> {
    ensure_parent(dest)?;

    match mode {
        TransferMode::Copy => {
            copy_file(source, dest)?;
            preserve_mtime(source, dest);
        }
        TransferMode::Move => {
            // Try rename first (faster for same filesystem)
            if fs::rename(source, dest).is_err() {
                // Fall back to copy + delete for cross-filesystem moves
                copy_file(source, dest)?;
                preserve_mtime(source, dest);
                fs::remove_file(source)?;
            }
        }
    }

    Ok(())
}

fn preserve_mtime(source: &Path, dest: &Path) {
    if let Ok(metadata) = fs::metadata(source)
        && let Ok(mtime) = metadata.modified()
    {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }
}

/// Copy file with buffered I/O for efficiency
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::create(dest)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}
