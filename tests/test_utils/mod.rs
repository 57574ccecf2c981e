#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use wayfarer_core::geodesy::{self, CrossTrack, Point, EARTH_RADIUS};
use wayfarer_core::gps_processor::Fix;
use wayfarer_core::route::{Route, Waypoint};
use wayfarer_core::track::Track;

pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS * std::f64::consts::PI / 180.0;

/// The point `north` and `east` meters away from `origin`, flat-earth
/// approximation that is plenty for a few kilometers.
pub fn offset(origin: &Point, north: f64, east: f64) -> Point {
    Point::new(
        origin.latitude + north / METERS_PER_DEGREE,
        origin.longitude + east / (METERS_PER_DEGREE * origin.latitude.to_radians().cos()),
    )
}

pub fn timestamp(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub fn fix(latitude: f64, longitude: f64, speed: f64, heading: f64) -> Fix {
    Fix::new(Point::new(latitude, longitude), timestamp(0)).with_motion(speed, heading)
}

/// East-bound track along the equator.
pub fn straight_track(n: usize, spacing: f64) -> Track {
    let origin = Point::new(0.0, 0.0);
    Track::from_points(
        "straight",
        (0..n).map(|i| offset(&origin, 0.0, i as f64 * spacing)),
    )
}

/// East, then north around a right-angle corner at index `n - 1`.
pub fn corner_track(n: usize) -> Track {
    let mut points: Vec<Point> = (0..n).map(|i| Point::new(0.0, i as f64 * 0.001)).collect();
    let corner = (n - 1) as f64 * 0.001;
    points.extend((1..n).map(|i| Point::new(i as f64 * 0.001, corner)));
    Track::from_points("corner", points)
}

/// East for `n` points, then straight back to the start.
pub fn out_and_back_track(n: usize) -> Track {
    let mut points: Vec<Point> = (0..n).map(|i| Point::new(0.0, i as f64 * 0.001)).collect();
    points.extend((1..n).map(|i| Point::new(0.0, (n - 1 - i) as f64 * 0.001)));
    Track::from_points("out_and_back", points)
}

/// A track heading roughly east that swings up to `amplitude` meters to either
/// side, with some GPS-like noise on top. Points are about 50m apart.
pub fn zigzag_track(seed: u64, n: usize, amplitude: f64) -> Track {
    let mut rng = StdRng::seed_from_u64(seed);
    let origin = Point::new(rng.random_range(-60.0..60.0), rng.random_range(-170.0..170.0));
    let mut points = Vec::with_capacity(n);
    let mut lateral: f64 = 0.0;
    let mut target: f64 = 0.0;
    for i in 0..n {
        if (lateral - target).abs() < 20.0 {
            target = rng.random_range(-amplitude..amplitude);
        }
        lateral += (target - lateral).clamp(-40.0, 40.0);
        let noise = rng.random_range(-5.0..5.0);
        points.push(offset(&origin, lateral + noise, i as f64 * 50.0));
    }
    Track::from_points("zigzag", points)
}

/// A -> B is 1.1km east, B -> C is 1.1km north.
pub fn three_point_route() -> Arc<Route> {
    Arc::new(Route::from_waypoints(
        "three",
        vec![
            Waypoint::new("A", 0.0, 0.0),
            Waypoint::new("B", 0.0, 0.01),
            Waypoint::new("C", 0.01, 0.01),
        ],
    ))
}

/// Index of every route waypoint in `track`, which must contain them.
pub fn track_indices(track: &Track, route: &Route) -> Vec<usize> {
    route
        .waypoints()
        .iter()
        .map(|w| {
            track
                .points()
                .iter()
                .position(|p| p.point.same_location(&w.point))
                .expect("waypoint is not a track point")
        })
        .collect()
}

/// Largest cross-track error of any track point relative to the leg that
/// covers it. Points that do not project onto their leg are skipped.
pub fn max_cross_track(track: &Track, route: &Route) -> f64 {
    let indices = track_indices(track, route);
    let mut max: f64 = 0.0;
    for leg in indices.windows(2) {
        let end = &track.points()[leg[1]].point;
        let course = geodesy::bearing(&track.points()[leg[0]].point, end);
        for p in &track.points()[leg[0]..leg[1]] {
            let xtk = geodesy::cross_track(
                geodesy::distance(&p.point, end),
                course,
                geodesy::bearing(&p.point, end),
            );
            if let CrossTrack::Defined(xtk) = xtk {
                max = max.max(xtk.abs());
            }
        }
    }
    max
}
