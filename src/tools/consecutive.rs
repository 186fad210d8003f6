//! Consecutive file number checker
//!
//! Camera file names carry a running number (`DSC_0001.DNG`). After a
//! restore from backup, gaps in that numbering show which files are still
//! missing.

use super::files_in;
use crate::error::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Default file name pattern; the first capture group is the file number
pub const DEFAULT_PATTERN: &str = r"^DSC_(\d{4})\.DNG$";

/// Numbering found in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub first: u64,
    pub last: u64,
    /// Inclusive runs of consecutive numbers
    pub runs: Vec<(u64, u64)>,
}

impl SequenceReport {
    /// Numbers missing between the first and last file
    pub fn missing(&self) -> u64 {
        (self.last - self.first + 1) - self.runs.iter().map(|(a, b)| b - a + 1).sum::<u64>()
    }
}

/// Map file numbers to file names for all names matching `pattern`
pub fn find_numbers<'a, I>(names: I, pattern: &Regex) -> BTreeMap<u64, String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let number = pattern.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect()
}

/// Collapse sorted numbers into inclusive runs
pub fn runs(numbers: impl IntoIterator<Item = u64>) -> Vec<(u64, u64)> {
    let mut runs: Vec<(u64, u64)> = Vec::new();
    for n in numbers {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => runs.push((n, n)),
        }
    }
    runs
}

/// Check the numbering of files directly inside `dir`
///
/// Returns `None` if no file name matches the pattern.
pub fn check_directory(dir: &Path, pattern: &Regex) -> Result<Option<SequenceReport>> {
    let files = files_in(dir)?;
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
        .collect();

    let numbers = find_numbers(names.iter().map(String::as_str), pattern);
    let (Some(first), Some(last)) = (
        numbers.keys().next().copied(),
        numbers.keys().next_back().copied(),
    ) else {
        return Ok(None);
    };

    Ok(Some(SequenceReport {
        first,
        last,
        runs: runs(numbers.keys().copied()),
    }))
}
