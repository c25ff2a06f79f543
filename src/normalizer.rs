//! Converts one raw telemetry record into a canonical [`Fix`].
//!
//! Pure aside from a single declination-oracle call per record. Calibration
//! offsets are injected at construction and never mutated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::declination::DeclinationModel;
use crate::error::{Error, Result};
use crate::geo;
use crate::schema::{self, Axis, FieldValue, Transform};

/// One ingested telemetry record, exactly as received: positional string
/// fields matching the declared schema. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub asset_id: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<String>,
}

/// Corrections for how the sensor package is mounted along the asset's axis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOffsets {
    pub heading_offset: f64,
    pub pitch_offset: f64,
    pub roll_offset: f64,
}

/// Magnetic and true variants of a compass angle, in whole degrees [0, 360).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompassPair {
    pub mag: i32,
    pub r#true: i32,
}

/// One normalized telemetry sample. Derived per query, never persisted in
/// this form.
#[derive(Debug, Clone, Serialize)]
pub struct Fix {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: CompassPair,
    pub course_over_ground: CompassPair,
    pub pitch: i32,
    pub roll: i32,
    /// Knots, one decimal place.
    pub velocity: f64,
    pub fix_quality: i32,
    pub temp1: f64,
    pub v1: f64,
    pub v2: f64,
}

/// Converts the concatenated degrees/minutes format emitted by the GPS
/// receiver to a signed decimal coordinate, rounded to 7 decimal places.
///
/// The degree field is 2 digits wide for N/S and 3 for E/W; the remainder is
/// minutes. Decoded from the raw string so sub-10-degree values keep their
/// leading zero.
pub fn dm_to_decimal(raw: &str, direction: &str) -> Result<f64> {
    let width = match direction {
        "N" | "S" => 2,
        "E" | "W" => 3,
        other => {
            return Err(Error::MissingLocation(format!(
                "bad hemisphere letter {:?}",
                other
            )));
        }
    };
    let sign = if direction == "S" || direction == "W" {
        -1.0
    } else {
        1.0
    };

    if raw.len() <= width || !raw.is_char_boundary(width) {
        return Err(Error::MissingLocation(format!(
            "degrees-minutes value too short: {:?}",
            raw
        )));
    }
    let degrees: f64 = raw[..width]
        .parse()
        .map_err(|_| Error::MissingLocation(format!("bad degrees in {:?}", raw)))?;
    let minutes: f64 = raw[width..]
        .parse()
        .map_err(|_| Error::MissingLocation(format!("bad minutes in {:?}", raw)))?;

    Ok(geo::round_to(sign * (degrees + minutes / 60.0), 7))
}

pub struct Normalizer {
    calib: CalibrationOffsets,
    declination: Arc<dyn DeclinationModel>,
}

impl Normalizer {
    /// Builds a normalizer, validating the static schema table once.
    pub fn new(calib: CalibrationOffsets, declination: Arc<dyn DeclinationModel>) -> Result<Self> {
        schema::validate_schema()?;
        Ok(Normalizer { calib, declination })
    }

    /// Normalizes one raw record into a [`Fix`].
    ///
    /// Fails with [`Error::Validation`] on a schema mismatch and
    /// [`Error::MissingLocation`] when the position cannot be decoded; no
    /// partial fix is ever returned.
    pub fn normalize(&self, raw: &RawRecord) -> Result<Fix> {
        let cast = schema::cast_fields(&raw.fields)?;
        let (latitude, longitude) = decode_position(raw, &cast)?;
        let decl = self.declination.declination(latitude, longitude);

        let mut fix = Fix {
            timestamp: raw.timestamp,
            latitude,
            longitude,
            heading: CompassPair::default(),
            course_over_ground: CompassPair::default(),
            pitch: 0,
            roll: 0,
            velocity: 0.0,
            fix_quality: 0,
            temp1: 0.0,
            v1: 0.0,
            v2: 0.0,
        };

        for (spec, value) in schema::SCHEMA.iter().zip(&cast) {
            match spec.transform {
                // Consumed by decode_position above.
                Transform::Direction | Transform::DmToDecimal { .. } => {}
                Transform::HeadingCorrect => {
                    let mag = geo::round_compass(value.as_f64() + self.calib.heading_offset);
                    let true_deg = geo::round_compass(mag as f64 + decl);
                    fix.heading = CompassPair {
                        mag,
                        r#true: true_deg,
                    };
                }
                Transform::CourseCorrect => {
                    let true_deg = geo::round_compass(value.as_f64());
                    let mag = geo::round_compass(true_deg as f64 - decl);
                    fix.course_over_ground = CompassPair {
                        mag,
                        r#true: true_deg,
                    };
                }
                Transform::OffsetCorrect(Axis::Pitch) => {
                    fix.pitch = (value.as_f64() + self.calib.pitch_offset).round() as i32;
                }
                Transform::OffsetCorrect(Axis::Roll) => {
                    fix.roll = (value.as_f64() + self.calib.roll_offset).round() as i32;
                }
                Transform::Velocity => {
                    fix.velocity = geo::round_to(value.as_f64(), 1);
                }
                Transform::Passthrough => match (spec.name, value) {
                    ("fixquality", FieldValue::Int(v)) => fix.fix_quality = *v as i32,
                    ("temp1", FieldValue::Float(v)) => fix.temp1 = *v,
                    ("v1", FieldValue::Float(v)) => fix.v1 = *v,
                    ("v2", FieldValue::Float(v)) => fix.v2 = *v,
                    _ => {}
                },
            }
        }

        Ok(fix)
    }
}

/// Decodes the latitude/longitude pair from the record's DM-encoded fields.
fn decode_position(raw: &RawRecord, cast: &[FieldValue]) -> Result<(f64, f64)> {
    let mut latitude = None;
    let mut longitude = None;

    for (i, spec) in schema::SCHEMA.iter().enumerate() {
        let Transform::DmToDecimal { direction_field } = spec.transform else {
            continue;
        };
        let dir_idx = schema::field_index(direction_field).ok_or_else(|| {
            Error::MissingLocation(format!("no direction field {}", direction_field))
        })?;
        let FieldValue::Str(direction) = &cast[dir_idx] else {
            return Err(Error::MissingLocation(format!(
                "direction field {} is not a string",
                direction_field
            )));
        };

        let decoded = dm_to_decimal(raw.fields[i].trim(), direction)?;
        match direction.as_str() {
            "N" | "S" => latitude = Some(decoded),
            _ => longitude = Some(decoded),
        }
    }

    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(Error::MissingLocation(
            "record carries no decodable position".to_string(),
        )),
    }
}
