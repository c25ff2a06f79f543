//! Geomagnetic declination oracle.
//!
//! The pipeline only needs `lat, lon -> degrees`; the model behind it is a
//! collaborator, so it sits behind a trait and is injected into the
//! normalizer at construction.

use crate::geo;

pub trait DeclinationModel: Send + Sync {
    /// Local angular offset between magnetic north and true north, in
    /// degrees. Positive means magnetic north lies east of true north.
    fn declination(&self, lat: f64, lon: f64) -> f64;
}

/// Tilted-dipole approximation: declination is taken as the initial
/// great-circle bearing from the observer to the geomagnetic north pole,
/// expressed in [-180, 180). Within a few degrees of full spherical-harmonic
/// models at mid latitudes, which is adequate for compass correction of a
/// slow-moving asset.
pub struct DipoleDeclination {
    pole_lat: f64,
    pole_lon: f64,
}

impl DipoleDeclination {
    pub fn new() -> Self {
        // IGRF-14 geomagnetic north pole, epoch 2025.
        DipoleDeclination {
            pole_lat: 80.9,
            pole_lon: -72.1,
        }
    }
}

impl Default for DipoleDeclination {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclinationModel for DipoleDeclination {
    fn declination(&self, lat: f64, lon: f64) -> f64 {
        let bearing = geo::initial_bearing(lat, lon, self.pole_lat, self.pole_lon);
        if bearing >= 180.0 { bearing - 360.0 } else { bearing }
    }
}

/// Constant-declination model for tests and offline replay.
pub struct FixedDeclination(pub f64);

impl DeclinationModel for FixedDeclination {
    fn declination(&self, _lat: f64, _lon: f64) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_model_ignores_position() {
        let model = FixedDeclination(13.2);
        assert_eq!(model.declination(37.7, -122.2), 13.2);
        assert_eq!(model.declination(-45.0, 170.0), 13.2);
    }

    #[test]
    fn test_dipole_declination_sign_on_us_coasts() {
        let model = DipoleDeclination::new();
        // San Francisco Bay: magnetic north is east of true north.
        assert!(model.declination(37.7, -122.2) > 0.0);
        // Maine: magnetic north is west of true north.
        assert!(model.declination(44.0, -69.0) < 0.0);
    }

    #[test]
    fn test_dipole_declination_within_half_turn() {
        let model = DipoleDeclination::new();
        for (lat, lon) in [(0.0, 0.0), (60.0, 30.0), (-33.0, 151.0), (71.0, -8.0)] {
            let d = model.declination(lat, lon);
            assert!((-180.0..180.0).contains(&d), "{},{} -> {}", lat, lon, d);
        }
    }
}
