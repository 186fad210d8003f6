//! EXIF capture date and GPS extraction

use super::MetadataReader;
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::trace;

/// EXIF tags to try for date extraction, in priority order
const DATE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,  // When the original image was taken
    Tag::DateTimeDigitized, // When the image was digitized
    Tag::DateTime,          // File modification date/time
];

/// Metadata reader backed by kamadak-exif
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifReader;

impl MetadataReader for ExifReader {
    fn read_capture_date(&self, path: &Path) -> Option<NaiveDateTime> {
        match extract_exif_time(path) {
            Ok(time) => Some(time),
            Err(e) => {
                trace!(?path, error = %e, "No EXIF capture date");
                None
            }
        }
    }
}

/// Date and position of a geotagged photo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTag {
    pub taken: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoTag {
    /// Coordinates of exactly 0,0 come from cameras writing empty GPS blocks
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

fn read_exif(path: &Path) -> Result<Exif> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Extract creation time from EXIF metadata
pub fn extract_exif_time(path: &Path) -> Result<NaiveDateTime> {
    let exif = read_exif(path)?;

    // Try each date tag in priority order
    for tag in DATE_TAGS {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY)
            && let Some(datetime) = parse_exif_datetime(&field.display_value().to_string())
        {
            trace!(?path, ?tag, "Found EXIF date");
            return Ok(datetime);
        }
    }

    Err(Error::ExifRead {
        path: path.to_path_buf(),
        message: "No valid date tag found in EXIF data".to_string(),
    })
}

/// Read the original capture date and GPS position of a photo
///
/// Only `DateTimeOriginal` is accepted as the date; a photo without it,
/// or without a complete GPS position, is an error.
pub fn extract_geotag(path: &Path) -> Result<GeoTag> {
    let exif = read_exif(path)?;
    let missing = |what: &str| Error::ExifRead {
        path: path.to_path_buf(),
        message: format!("No {} found", what),
    };

    let taken = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .and_then(|f| parse_exif_datetime(&f.display_value().to_string()))
        .ok_or_else(|| missing("date"))?;

    let coordinate = |value: Tag, reference: Tag, negative: char| -> Option<f64> {
        let degrees = dms_to_degrees(exif.get_field(value, In::PRIMARY)?)?;
        let is_negative = exif
            .get_field(reference, In::PRIMARY)
            .is_some_and(|r| r.display_value().to_string().contains(negative));
        Some(if is_negative { -degrees } else { degrees })
    };

    let latitude = coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')
        .ok_or_else(|| missing("coordinates"))?;
    let longitude = coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')
        .ok_or_else(|| missing("coordinates"))?;

    Ok(GeoTag {
        taken,
        latitude,
        longitude,
    })
}

/// Convert a degrees/minutes/seconds rational triple to decimal degrees
fn dms_to_degrees(field: &Field) -> Option<f64> {
    match &field.value {
        Value::Rational(v) if v.len() >= 3 => {
            let part = |i: usize| {
                if v[i].num == 0 || v[i].denom == 0 {
                    0.0
                } else {
                    v[i].to_f64()
                }
            };
            Some(part(0) + part(1) / 60.0 + part(2) / 3600.0)
        }
        _ => None,
    }
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    // EXIF format: "2024:01:15 14:30:00" or with quotes
    let s = s.trim().trim_matches('"');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}
