//! Export geotagged photos as a KML document
//!
//! Each photo with an original capture date and a GPS position becomes a
//! placemark with a camera view, so the photos can be replayed as a
//! timeline in Google Earth.

use crate::metadata::GeoTag;
use crate::metadata::exif::extract_geotag;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const KML_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One photo on the map
#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub path: PathBuf,
    pub tag: GeoTag,
}

/// Result of scanning a folder for geotagged photos
#[derive(Debug, Clone, Default)]
pub struct GeoScan {
    pub placemarks: Vec<Placemark>,
    /// Files without a usable date or position
    pub skipped: usize,
}

/// Walk `dir` and collect every photo with a date and a real position
///
/// Problems with a single file only skip that file.
pub fn scan(dir: &Path) -> GeoScan {
    scan_with(dir, extract_geotag)
}

fn scan_with<F>(dir: &Path, read: F) -> GeoScan
where
    F: Fn(&Path) -> crate::error::Result<GeoTag>,
{
    let mut scan = GeoScan::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Unreadable entry, skipping");
                scan.skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let tag = match read(path) {
            Ok(tag) => tag,
            Err(e) => {
                debug!(?path, error = %e, "Skipping");
                scan.skipped += 1;
                continue;
            }
        };
        if tag.is_null_island() {
            debug!(?path, "Coordinates are probably bogus, skipping");
            scan.skipped += 1;
            continue;
        }

        scan.placemarks.push(Placemark {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: path.to_path_buf(),
            tag,
        });
    }

    scan
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write placemarks as a KML 2.2 document
pub fn write_kml<W: Write>(placemarks: &[Placemark], mut out: W) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2">"#
    )?;
    writeln!(out, "  <Document>")?;

    for mark in placemarks {
        let when = mark.tag.taken.format(KML_DATE_FORMAT).to_string();
        writeln!(out, "    <Placemark>")?;
        writeln!(out, "      <name>{}</name>", escape(&mark.name))?;
        writeln!(out, "      <Camera>")?;
        writeln!(out, "        <gx:TimeStamp>")?;
        writeln!(out, "          <when>{}</when>", when)?;
        writeln!(out, "        </gx:TimeStamp>")?;
        writeln!(out, "        <latitude>{}</latitude>", mark.tag.latitude)?;
        writeln!(out, "        <longitude>{}</longitude>", mark.tag.longitude)?;
        writeln!(out, "      </Camera>")?;
        writeln!(out, "      <ExtendedData>")?;
        for (name, value) in [("Path", mark.path.display().to_string()), ("Date", when)] {
            writeln!(out, "        <Data name=\"{}\">", name)?;
            writeln!(out, "          <value>{}</value>", escape(&value))?;
            writeln!(out, "        </Data>")?;
        }
        writeln!(out, "      </ExtendedData>")?;
        writeln!(out, "    </Placemark>")?;
    }

    writeln!(out, "  </Document>")?;
    writeln!(out, "</kml>")?;
    out.flush()
}
