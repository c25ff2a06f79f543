//! Runtime configuration: calibration offsets, query windows, pagination
//! cap, and trip thresholds.
//!
//! Stored as a plain JSON object on disk; every section falls back to its
//! default when absent:
//! ```json
//! {
//!   "calibration": { "heading_offset": -4.0 },
//!   "query": { "default_window_hours": 24, "distance_unit": "kilometers" },
//!   "trips": { "fixes_threshold": 5 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo::DistanceUnit;
use crate::normalizer::CalibrationOffsets;
use crate::trips::TripConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Trailing window applied when a fixes query gives no bounds.
    pub default_window_hours: i64,
    /// Freshness window for the latest-fix lookup.
    pub latest_window_minutes: i64,
    /// Page-count safety limit for one drain.
    pub max_pages: usize,
    /// Unit for aggregate path distances.
    pub distance_unit: DistanceUnit,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            default_window_hours: 24 * 7,
            latest_window_minutes: 19,
            max_pages: 10_000,
            distance_unit: DistanceUnit::NauticalMiles,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub calibration: CalibrationOffsets,
    pub query: QueryConfig,
    pub trips: TripConfig,
}

impl TrackerConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.query.default_window_hours, 168);
        assert_eq!(config.query.latest_window_minutes, 19);
        assert_eq!(config.query.max_pages, 10_000);
        assert_eq!(config.query.distance_unit, DistanceUnit::NauticalMiles);
        assert_eq!(config.trips.distance_threshold_m, 33.0);
        assert_eq!(config.calibration.heading_offset, 0.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults_elsewhere() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{"calibration": {"heading_offset": -4.5}, "query": {"distance_unit": "kilometers"}}"#,
        )
        .unwrap();
        assert_eq!(config.calibration.heading_offset, -4.5);
        assert_eq!(config.calibration.pitch_offset, 0.0);
        assert_eq!(config.query.distance_unit, DistanceUnit::Kilometers);
        assert_eq!(config.query.max_pages, 10_000);
    }
}
