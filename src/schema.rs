//! Declared telemetry payload schema.
//!
//! The wire payload is a fixed-order, comma-separated field list. Each field
//! carries a declared cast and exactly one transform kind from a closed set;
//! the normalizer dispatches on this table instead of switching on field
//! names. The table is validated once at startup.

use crate::error::{Error, Result};

/// Type a raw field must cast to before any transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    Str,
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pitch,
    Roll,
}

/// Closed set of transform kinds applied by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Numeric cast only, emitted as-is (temperature, voltages, fix quality).
    Passthrough,
    /// Hemisphere letter consumed by a `DmToDecimal` field, not emitted.
    Direction,
    /// Degrees-minutes concatenated value, decoded with the named direction
    /// field's hemisphere letter.
    DmToDecimal { direction_field: &'static str },
    /// Raw magnetometer heading: calibration offset plus declination.
    HeadingCorrect,
    /// GPS course over ground: true course, magnetic derived via declination.
    CourseCorrect,
    /// Raw orientation count plus the matching calibration offset.
    OffsetCorrect(Axis),
    /// Speed over ground in knots, rounded to one decimal.
    Velocity,
}

pub struct FieldSpec {
    pub name: &'static str,
    pub cast: Cast,
    pub transform: Transform,
}

/// Payload layout as emitted by the tracker firmware: GPS block, then the
/// BNO055 orientation counts, then the MCP9808 temperature and bus voltages.
pub static SCHEMA: &[FieldSpec] = &[
    FieldSpec { name: "lat", cast: Cast::Str, transform: Transform::Direction },
    FieldSpec {
        name: "latitude",
        cast: Cast::Float,
        transform: Transform::DmToDecimal { direction_field: "lat" },
    },
    FieldSpec { name: "lon", cast: Cast::Str, transform: Transform::Direction },
    FieldSpec {
        name: "longitude",
        cast: Cast::Float,
        transform: Transform::DmToDecimal { direction_field: "lon" },
    },
    FieldSpec { name: "speed", cast: Cast::Float, transform: Transform::Velocity },
    FieldSpec { name: "angle", cast: Cast::Int, transform: Transform::CourseCorrect },
    FieldSpec { name: "fixquality", cast: Cast::Int, transform: Transform::Passthrough },
    FieldSpec { name: "x", cast: Cast::Int, transform: Transform::HeadingCorrect },
    FieldSpec { name: "y", cast: Cast::Int, transform: Transform::OffsetCorrect(Axis::Pitch) },
    FieldSpec { name: "z", cast: Cast::Int, transform: Transform::OffsetCorrect(Axis::Roll) },
    FieldSpec { name: "temp1", cast: Cast::Float, transform: Transform::Passthrough },
    FieldSpec { name: "v1", cast: Cast::Float, transform: Transform::Passthrough },
    FieldSpec { name: "v2", cast: Cast::Float, transform: Transform::Passthrough },
];

/// A raw field after its declared cast has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Str(_) => f64::NAN,
            FieldValue::Int(v) => *v as f64,
            FieldValue::Float(v) => *v,
        }
    }
}

/// Checks the static table for internal consistency. Run once at startup.
pub fn validate_schema() -> Result<()> {
    for spec in SCHEMA {
        if let Transform::DmToDecimal { direction_field } = spec.transform {
            let dir = SCHEMA.iter().find(|s| s.name == direction_field);
            match dir {
                Some(d) if d.transform == Transform::Direction => {}
                _ => {
                    return Err(Error::Validation(format!(
                        "schema field {} references missing direction field {}",
                        spec.name, direction_field
                    )));
                }
            }
        }
    }
    Ok(())
}

pub fn field_index(name: &str) -> Option<usize> {
    SCHEMA.iter().position(|s| s.name == name)
}

/// Applies the declared casts to a positional field list.
///
/// Fails with [`Error::Validation`] on a field-count mismatch, a failed
/// cast, or a non-finite numeric; no partial result is produced.
pub fn cast_fields(fields: &[String]) -> Result<Vec<FieldValue>> {
    if fields.len() != SCHEMA.len() {
        return Err(Error::Validation(format!(
            "expected {} fields, got {}",
            SCHEMA.len(),
            fields.len()
        )));
    }

    let mut out = Vec::with_capacity(SCHEMA.len());
    for (spec, raw) in SCHEMA.iter().zip(fields) {
        let raw = raw.trim();
        let value = match spec.cast {
            Cast::Str => FieldValue::Str(raw.to_string()),
            // Integer fields arrive as numerics like "54" or "54.00";
            // truncate toward zero as the firmware intends.
            Cast::Int => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| FieldValue::Int(v.trunc() as i64))
                .ok_or_else(|| {
                    Error::Validation(format!("field {} is not an integer: {:?}", spec.name, raw))
                })?,
            Cast::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Float)
                .ok_or_else(|| {
                    Error::Validation(format!("field {} is not a float: {:?}", spec.name, raw))
                })?,
        };
        out.push(value);
    }
    Ok(out)
}
