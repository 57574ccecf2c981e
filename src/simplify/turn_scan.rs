use anyhow::Result;

use crate::geodesy::{self, CrossTrack, Point, EARTH_RADIUS};
use crate::simplify::{peak_insertion, Context};

// Heading of the leg that starts at the last committed waypoint, plus its
// reciprocal which is what a point past a turn is measured against.
#[derive(Clone, Copy)]
struct Leg {
    course: f64,
    reverse: f64,
}

impl Leg {
    fn new(course: f64) -> Self {
        Leg {
            course,
            reverse: (course + 180.0) % 360.0,
        }
    }
}

/// Returns the chosen track indices, first and last included, and whether
/// the final refinement finished within the insertion cap.
pub(super) fn run(points: &[&Point], context: &Context) -> Result<(Vec<usize>, bool)> {
    let tolerance = context.tolerance;
    let config = context.config;
    let last = points.len() - 1;

    let mut indices = vec![0];
    let mut anchor = 0;
    let mut leg: Option<Leg> = None;
    let mut candidate: Option<usize> = None;
    let mut distance: f64 = 0.0;
    let mut accumulated_turn: f64 = 0.0;
    let mut previous_bearing: f64 = 0.0;
    let mut deviation: f64 = 0.0;

    for i in 1..points.len() {
        context.check_cancelled()?;
        let (prev, current) = (points[i - 1], points[i]);
        distance += geodesy::distance(prev, current);
        let bearing = geodesy::bearing(prev, current);
        accumulated_turn += geodesy::turn(previous_bearing, bearing);
        if accumulated_turn.abs() >= 360.0 {
            accumulated_turn -= 360.0 * accumulated_turn.signum();
        }
        previous_bearing = bearing;

        let Some(current_leg) = leg else {
            // The first stretch only establishes the initial course.
            if distance > tolerance {
                let course = geodesy::bearing(points[anchor], current);
                leg = Some(Leg::new(course));
                previous_bearing = course;
                accumulated_turn = 0.0;
            }
            continue;
        };

        if accumulated_turn.abs() > config.turn_threshold {
            if candidate.is_none() {
                candidate = Some(i);
                continue;
            }
        } else if candidate.is_some() && deviation.abs() < tolerance / 10.0 {
            candidate = None;
            deviation = 0.0;
        }

        if let Some(turn_point) = candidate {
            let to_turn = geodesy::distance(current, points[turn_point]);
            let bearing_to_turn = geodesy::bearing(current, points[turn_point]);
            let xtk = match geodesy::cross_track(to_turn, current_leg.reverse, bearing_to_turn) {
                // turned at a sharp angle
                CrossTrack::Undefined => {
                    geodesy::cross_track(to_turn, current_leg.course, bearing_to_turn)
                }
                xtk => xtk,
            };
            // square turn, abeam the turn point on both courses
            deviation = xtk
                .meters()
                .unwrap_or_else(|| off_leg(points[anchor], current_leg.course, current));
            if deviation.abs() > tolerance * config.turn_commit_factor {
                trace!("[simplify] turn at track point {}", turn_point);
                indices.push(turn_point);
                anchor = turn_point;
                let course = geodesy::bearing(points[anchor], current);
                leg = Some(Leg::new(course));
                previous_bearing = course;
                accumulated_turn = 0.0;
                candidate = None;
                distance = 0.0;
                deviation = 0.0;
            }
            continue;
        }

        if distance > tolerance * config.max_leg_factor {
            trace!("[simplify] long leg split at track point {}", i);
            indices.push(i);
            anchor = i;
            distance = 0.0;
        }
    }

    if indices.last() != Some(&last) {
        indices.push(last);
    }
    // The scan only looks at turns, gentle drift within a leg is bounded here.
    peak_insertion::refine(
        points,
        &indices,
        tolerance * config.turn_commit_factor,
        context,
    )
}

/// Signed distance of `point` from the line leaving `anchor` on `course`,
/// positive to the right.
fn off_leg(anchor: &Point, course: f64, point: &Point) -> f64 {
    let angular = geodesy::distance(anchor, point) / EARTH_RADIUS;
    let delta = geodesy::turn(course, geodesy::bearing(anchor, point));
    (angular.sin() * delta.to_radians().sin()).asin() * EARTH_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimplifyConfig;

    fn context(config: &SimplifyConfig, tolerance: f64) -> Context<'_> {
        Context {
            config,
            tolerance,
            cancel: None,
        }
    }

    #[test]
    fn turn_is_kept() {
        // east, then north-east; 0.001 degrees is about 111m
        let mut raw: Vec<Point> = (0..=20).map(|i| Point::new(0.0, i as f64 * 0.001)).collect();
        raw.extend((1..=20).map(|i| Point::new(i as f64 * 0.001, 0.02 + i as f64 * 0.001)));
        let points: Vec<&Point> = raw.iter().collect();
        let config = SimplifyConfig::default();
        let (indices, converged) = run(&points, &context(&config, 100.0)).unwrap();
        assert!(converged);
        assert_eq!(indices.first(), Some(&0));
        assert_eq!(indices.last(), Some(&40));
        assert!(indices.contains(&21), "{:?}", indices);
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn last_point_is_not_duplicated() {
        let raw = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 2.0),
        ];
        let points: Vec<&Point> = raw.iter().collect();
        let config = SimplifyConfig::default();
        assert_eq!(run(&points, &context(&config, 200.0)).unwrap().0, vec![0, 2]);
    }

    #[test]
    fn square_turn_is_kept() {
        // 2.2km east, then 2.2km north
        let mut raw: Vec<Point> = (0..=20).map(|i| Point::new(0.0, i as f64 * 0.001)).collect();
        raw.extend((1..=20).map(|i| Point::new(i as f64 * 0.001, 0.02)));
        let points: Vec<&Point> = raw.iter().collect();
        let config = SimplifyConfig::default();
        let (indices, _) = run(&points, &context(&config, 200.0)).unwrap();
        assert_eq!(indices, vec![0, 21, 40]);
    }

    #[test]
    fn off_leg_sign() {
        let anchor = Point::new(0.0, 0.0);
        let north = off_leg(&anchor, 90.0, &Point::new(0.01, 0.01));
        let south = off_leg(&anchor, 90.0, &Point::new(-0.01, 0.01));
        assert!(north < 0.0);
        assert!((north + south).abs() < 1e-6);
        assert!((north.abs() - 1111.9).abs() < 1.0, "{}", north);
    }
}
