//! Trip segmentation: reconstructs discrete movement episodes from a
//! time-ordered fix sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo;
use crate::normalizer::Fix;

/// Movement thresholds for segmentation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TripConfig {
    /// Consecutive-fix displacement that counts as movement, in meters.
    pub distance_threshold_m: f64,
    /// Velocity that counts as movement, in knots.
    pub speed_threshold_kn: f64,
    /// A trip is emitted only when its fix count strictly exceeds this.
    pub fixes_threshold: usize,
}

impl Default for TripConfig {
    fn default() -> Self {
        TripConfig {
            distance_threshold_m: 33.0,
            speed_threshold_kn: 1.0,
            fixes_threshold: 3,
        }
    }
}

/// A maximal contiguous run of fixes showing sustained movement. Computed on
/// demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub num_fixes: usize,
    /// Path length over the trip's fixes, in meters.
    pub distance: f64,
}

enum State {
    Idle,
    Active {
        start: DateTime<Utc>,
        coords: Vec<(f64, f64)>,
        fix_count: usize,
    },
}

/// Segments an ascending fix sequence into trips.
///
/// Single forward pass over consecutive pairs. A pair is "moving" when the
/// displacement reaches the distance threshold or the newer fix's velocity
/// reaches the speed threshold. A trip still open at the end of the sequence
/// is discarded: trips must be bounded by an observed deceleration inside
/// the queried window, so callers wanting trips that straddle the window
/// edge must widen the window.
///
/// Fails with [`Error::OrderingViolation`] if the input is not ascending in
/// time.
pub fn segment_trips(fixes: &[Fix], config: &TripConfig) -> Result<Vec<Trip>> {
    let mut trips = Vec::new();
    let mut state = State::Idle;

    for pair in fixes.windows(2) {
        let (prev, fix) = (&pair[0], &pair[1]);
        if fix.timestamp < prev.timestamp {
            return Err(Error::OrderingViolation {
                prev: prev.timestamp.to_rfc3339(),
                next: fix.timestamp.to_rfc3339(),
            });
        }

        let d = geo::haversine_distance(prev.latitude, prev.longitude, fix.latitude, fix.longitude);
        let moving = d >= config.distance_threshold_m || fix.velocity >= config.speed_threshold_kn;

        state = match state {
            State::Idle if moving => State::Active {
                start: fix.timestamp,
                coords: vec![(fix.latitude, fix.longitude)],
                fix_count: 1,
            },
            State::Idle => State::Idle,
            State::Active {
                start,
                mut coords,
                fix_count,
            } if moving => {
                coords.push((fix.latitude, fix.longitude));
                State::Active {
                    start,
                    coords,
                    fix_count: fix_count + 1,
                }
            }
            State::Active {
                start,
                mut coords,
                fix_count,
            } => {
                // The decelerating fix bounds the trip.
                coords.push((fix.latitude, fix.longitude));
                let num_fixes = fix_count + 1;
                if num_fixes > config.fixes_threshold {
                    trips.push(Trip {
                        start,
                        end: fix.timestamp,
                        num_fixes,
                        distance: path_distance(&coords),
                    });
                }
                State::Idle
            }
        };
    }

    Ok(trips)
}

/// Sum of consecutive-pair great-circle distances, in meters.
fn path_distance(coords: &[(f64, f64)]) -> f64 {
    coords
        .windows(2)
        .map(|w| geo::haversine_distance(w[0].0, w[0].1, w[1].0, w[1].1))
        .sum()
}
