//! File type identification and conversion decisions

use std::collections::HashSet;
use std::path::Path;

/// Decides a file's normalised type tag and whether it must be converted
/// to DNG, based on a camera's list of convertible extensions.
#[derive(Debug, Clone, Default)]
pub struct FileClassifier {
    /// Extensions with leading dot, matched exactly (e.g. ".NEF")
    convert: HashSet<String>,
}

impl FileClassifier {
    /// Create a classifier from the configured convert list
    pub fn new<I, S>(convert_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            convert: convert_extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Classify a file, returning its type tag and whether conversion is required
    pub fn classify(&self, path: &Path) -> (String, bool) {
        (identify_file(path), self.needs_conversion(path))
    }

    /// Check if the file's uppercase extension is on the convert list
    pub fn needs_conversion(&self, path: &Path) -> bool {
        if self.convert.is_empty() {
            return false;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.convert.contains(&format!(".{}", ext.to_uppercase())),
            None => false,
        }
    }
}

/// Normalised file identification: the uppercase extension, with all
/// JPEG spellings folded into `JPEG`
pub fn identify_file(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_uppercase();

    match ext.as_str() {
        "JPG" | "JPEG" | "JFIF" => "JPEG".to_string(),
        _ => ext,
    }
}
