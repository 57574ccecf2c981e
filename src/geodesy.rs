/* Spherical geodesy used by both the navigator and the track simplifier.
Everything here is a pure function over degrees and meters, NaN inputs simply
propagate to the output.
*/
use chrono::{DateTime, Utc};

pub const EARTH_RADIUS: f64 = 6371000.0; // unit: meter

// Points closer than this (in degrees) are treated as the same location.
const COINCIDENT_EPS: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Point {
            latitude,
            longitude,
            elevation: None,
            timestamp: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    pub fn same_location(&self, other: &Point) -> bool {
        (self.latitude - other.latitude).abs() < COINCIDENT_EPS
            && (self.longitude - other.longitude).abs() < COINCIDENT_EPS
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self, other)
    }

    pub fn bearing_to(&self, other: &Point) -> f64 {
        bearing(self, other)
    }
}

/// Signed offset from a course line, or `Undefined` when the point does not
/// project onto the leg (it is abeam or past the terminal point).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CrossTrack {
    Defined(f64),
    Undefined,
}

impl CrossTrack {
    pub fn meters(&self) -> Option<f64> {
        match self {
            CrossTrack::Defined(m) => Some(*m),
            CrossTrack::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, CrossTrack::Defined(_))
    }
}

/// Great-circle (haversine) distance in meters.
pub fn distance(from: &Point, to: &Point) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // `min` keeps rounding noise from pushing asin out of its domain
    2.0 * EARTH_RADIUS * a.sqrt().min(1.0).asin()
}

/// Initial bearing from `from` to `to`, in [0, 360). Coincident points give 0.
pub fn bearing(from: &Point, to: &Point) -> f64 {
    if from.same_location(to) {
        return 0.0;
    }
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Signed minimal rotation from `from_bearing` to `to_bearing`, in (-180, 180].
pub fn turn(from_bearing: f64, to_bearing: f64) -> f64 {
    let mut turn = (to_bearing - from_bearing) % 360.0;
    if turn > 180.0 {
        turn -= 360.0;
    } else if turn <= -180.0 {
        turn += 360.0;
    }
    turn
}

/// Cross-track error of a point given its distance and bearing to the end of
/// a course line. Positive values are right of the course.
pub fn cross_track(distance_to_end: f64, course: f64, bearing_to_end: f64) -> CrossTrack {
    let delta = turn(bearing_to_end, course);
    if delta.abs() >= 90.0 {
        return CrossTrack::Undefined;
    }
    let angular = distance_to_end / EARTH_RADIUS;
    CrossTrack::Defined((angular.sin() * delta.to_radians().sin()).asin() * EARTH_RADIUS)
}

/// Component of `speed` along the course when the course is `abs_turn`
/// degrees off the direction of travel.
pub fn vmg(speed: f64, abs_turn: f64) -> f64 {
    if abs_turn >= 90.0 {
        return 0.0;
    }
    (speed * abs_turn.to_radians().cos()).max(0.0)
}
