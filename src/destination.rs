//! Destination path resolution from capture dates and folder templates
//!
//! Folder templates are plain text with `{year}`, `{month}` and `{day}`
//! placeholders. A placeholder may carry a width, `{month:2}`, or a
//! zero-padded width, `{month:02}`.

use crate::config::ConfigError;
use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extension given to files that are converted
pub const DNG_EXTENSION: &str = "DNG";

type Pattern = std::result::Result<Regex, regex::Error>;

static PLACEHOLDER: OnceLock<Pattern> = OnceLock::new();
static FIELD_SPEC: OnceLock<Pattern> = OnceLock::new();

fn placeholder_pattern() -> std::result::Result<&'static Regex, regex::Error> {
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([^{}]*)\}"))
        .as_ref()
        .map_err(Clone::clone)
}

fn field_spec_pattern() -> std::result::Result<&'static Regex, regex::Error> {
    FIELD_SPEC
        .get_or_init(|| Regex::new(r"^(year|month|day)(?::(0)?([1-9][0-9]?))?$"))
        .as_ref()
        .map_err(Clone::clone)
}

/// Date field substituted into a folder template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: DateField,
        width: usize,
        zero_pad: bool,
    },
}

/// Parsed folder-structure template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FolderTemplate {
    /// Template used when a target doesn't specify one
    pub const DEFAULT: &'static str = "{year}/{year}-{month:02}-{day:02}";

    /// Parse a template, rejecting unknown fields and stray braces
    pub fn parse(template: &str) -> std::result::Result<Self, ConfigError> {
        let malformed = |message: String| ConfigError::Template {
            template: template.to_string(),
            message,
        };

        let placeholder = placeholder_pattern().map_err(|e| malformed(e.to_string()))?;
        let field_spec = field_spec_pattern().map_err(|e| malformed(e.to_string()))?;

        let mut segments = Vec::new();
        let mut last = 0;

        for caps in placeholder.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            push_literal(&mut segments, &template[last..whole.start()]).map_err(&malformed)?;

            let spec = &caps[1];
            let field_caps = field_spec
                .captures(spec)
                .ok_or_else(|| malformed(format!("unknown field '{{{}}}'", spec)))?;

            let field = match &field_caps[1] {
                "year" => DateField::Year,
                "month" => DateField::Month,
                _ => DateField::Day,
            };
            let zero_pad = field_caps.get(2).is_some();
            let width = field_caps
                .get(3)
                .and_then(|w| w.as_str().parse().ok())
                .unwrap_or(0);

            segments.push(Segment::Field {
                field,
                width,
                zero_pad,
            });
            last = whole.end();
        }
        push_literal(&mut segments, &template[last..]).map_err(&malformed)?;

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// The template text as configured
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Substitute the date fields, producing a relative folder path
    pub fn render(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    width,
                    zero_pad,
                } => {
                    let value = match field {
                        DateField::Year => date.year() as i64,
                        DateField::Month => date.month() as i64,
                        DateField::Day => date.day() as i64,
                    };
                    if *zero_pad {
                        out.push_str(&format!("{:0width$}", value, width = *width));
                    } else {
                        out.push_str(&format!("{:>width$}", value, width = *width));
                    }
                }
            }
        }
        out
    }

    /// Destination directory for a capture date under the target root
    pub fn directory_for(&self, date: NaiveDate, target_root: &Path) -> PathBuf {
        target_root.join(self.render(date))
    }

    /// Full destination path for a source file
    ///
    /// Files that are converted get the `.DNG` extension regardless of
    /// the case or spelling of their original extension.
    pub fn resolve(
        &self,
        date: NaiveDate,
        target_root: &Path,
        source: &Path,
        convert: bool,
    ) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| Error::FileName {
            path: source.to_path_buf(),
        })?;

        let dest = self.directory_for(date, target_root).join(file_name);
        Ok(if convert { dng_suffix_for(&dest) } else { dest })
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> std::result::Result<(), String> {
    if text.is_empty() {
        return Ok(());
    }
    if text.contains(['{', '}']) {
        return Err(format!("unbalanced brace in '{}'", text));
    }
    segments.push(Segment::Literal(text.to_string()));
    Ok(())
}

/// Replace a path's extension with `.DNG`
pub fn dng_suffix_for(path: &Path) -> PathBuf {
    path.with_extension(DNG_EXTENSION)
}
