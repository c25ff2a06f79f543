//! Output formatting and persistence for query results.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::normalizer::Fix;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Flat CSV projection of a [`Fix`]; the nested compass pairs become
/// `*_mag`/`*_true` columns.
#[derive(Serialize)]
struct FixRow {
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    heading_mag: i32,
    heading_true: i32,
    course_mag: i32,
    course_true: i32,
    pitch: i32,
    roll: i32,
    velocity: f64,
    fix_quality: i32,
    temp1: f64,
    v1: f64,
    v2: f64,
}

impl From<&Fix> for FixRow {
    fn from(fix: &Fix) -> Self {
        FixRow {
            timestamp: fix.timestamp,
            latitude: fix.latitude,
            longitude: fix.longitude,
            heading_mag: fix.heading.mag,
            heading_true: fix.heading.r#true,
            course_mag: fix.course_over_ground.mag,
            course_true: fix.course_over_ground.r#true,
            pitch: fix.pitch,
            roll: fix.roll,
            velocity: fix.velocity,
            fix_quality: fix.fix_quality,
            temp1: fix.temp1,
            v1: fix.v1,
            v2: fix.v2,
        }
    }
}

/// Prints a serializable result as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends fixes as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_fixes(path: &str, fixes: &[Fix]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = fixes.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for fix in fixes {
        writer.serialize(FixRow::from(fix))?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::CompassPair;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_fix() -> Fix {
        Fix {
            timestamp: "2026-08-01T10:00:00Z".parse().unwrap(),
            latitude: 37.7208333,
            longitude: -122.2211383,
            heading: CompassPair { mag: 120, r#true: 133 },
            course_over_ground: CompassPair { mag: 41, r#true: 54 },
            pitch: -3,
            roll: 2,
            velocity: 5.3,
            fix_quality: 1,
            temp1: 18.5,
            v1: 12.6,
            v2: 5.1,
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&sample_fix()).unwrap();
    }

    #[test]
    fn test_append_fixes_creates_file() {
        let path = temp_path("asset_tracker_test_create.csv");
        let _ = fs::remove_file(&path); // clean up any prior run

        append_fixes(&path, &[sample_fix()]).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("heading_mag"));
        assert!(content.contains("37.7208333"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_fixes_writes_header_once() {
        let path = temp_path("asset_tracker_test_header.csv");
        let _ = fs::remove_file(&path);

        append_fixes(&path, &[sample_fix()]).unwrap();
        append_fixes(&path, &[sample_fix()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content.lines().filter(|l| l.contains("timestamp")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
