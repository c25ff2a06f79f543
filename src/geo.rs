//! Geodesy helpers shared by the normalizer, the aggregation layer, and the
//! trip segmenter.
//!
//! One geodesic model is used everywhere: haversine on a spherical Earth of
//! radius 6 371 000 m. Its error against the WGS-84 ellipsoid stays under
//! 0.5 % over the distances involved here.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const METERS_PER_NAUTICAL_MILE: f64 = 1_852.0;

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from point 1 to point 2, in degrees [0, 360).
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
    compass_normalize(y.atan2(x).to_degrees())
}

/// Folds any number of degrees into compass range [0, 360).
/// Examples: -10 -> 350, 375 -> 15, 360 -> 0, 240 -> 240.
pub fn compass_normalize(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Rounds to whole degrees, then re-folds so values like 359.7 cannot land
/// on 360 after rounding.
pub fn round_compass(degrees: f64) -> i32 {
    compass_normalize(degrees.round()) as i32
}

/// Rounds a value to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let multiplier = 10f64.powi(precision as i32);
    (value * multiplier).round() / multiplier
}

/// Unit in which aggregate path distances are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    #[default]
    NauticalMiles,
}

impl DistanceUnit {
    pub fn from_meters(&self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Meters => meters,
            DistanceUnit::Kilometers => meters / 1_000.0,
            DistanceUnit::NauticalMiles => meters / METERS_PER_NAUTICAL_MILE,
        }
    }
}

/// Bounding box over a set of coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    pub fn from_point(lat: f64, lng: f64) -> Self {
        Bounds {
            min_lat: lat,
            max_lat: lat,
            min_lng: lng,
            max_lng: lng,
        }
    }

    pub fn extend(&mut self, lat: f64, lng: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lng = self.min_lng.min(lng);
        self.max_lng = self.max_lng.max(lng);
    }
}
