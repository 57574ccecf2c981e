use itertools::Itertools;
use uuid::Uuid;

use crate::geodesy::{self, CrossTrack, Point};

#[derive(Clone, Debug, PartialEq)]
pub struct Waypoint {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub point: Point,
    /// Meters, `0` means "use the navigation default".
    pub proximity: u32,
}

impl Waypoint {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self::at(name, Point::new(latitude, longitude))
    }

    pub fn at(name: &str, point: Point) -> Self {
        Waypoint {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            point,
            proximity: 0,
        }
    }

    pub fn with_proximity(mut self, proximity: u32) -> Self {
        self.proximity = proximity;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Route {
    pub name: String,
    pub description: String,
    pub show: bool,
    waypoints: Vec<Waypoint>,
    distance: f64,
}

impl Route {
    pub fn new(name: &str) -> Self {
        Route {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn from_waypoints(name: &str, waypoints: Vec<Waypoint>) -> Self {
        let mut route = Route::new(name);
        route.waypoints = waypoints;
        route.recompute_distance();
        route
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn waypoint(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Total length in meters.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        if let Some(last) = self.waypoints.last() {
            self.distance += geodesy::distance(&last.point, &waypoint.point);
        }
        self.waypoints.push(waypoint);
    }

    /// Inserts at `position`, shifting later waypoints. Positions past the end
    /// append.
    pub fn insert_waypoint(&mut self, position: usize, waypoint: Waypoint) {
        let position = position.min(self.waypoints.len());
        self.waypoints.insert(position, waypoint);
        self.recompute_distance();
    }

    /// Inserts into the leg whose course line passes closest to the waypoint.
    /// Appends when the waypoint is not abeam of any leg. Returns the position
    /// it ended up at.
    pub fn insert_waypoint_nearest(&mut self, waypoint: Waypoint) -> usize {
        let mut position = self.waypoints.len();
        let mut best = f64::MAX;
        for (i, leg) in self.waypoints.windows(2).enumerate() {
            let (start, end) = (&leg[0].point, &leg[1].point);
            let p = &waypoint.point;
            let forward = geodesy::cross_track(
                geodesy::distance(p, end),
                geodesy::bearing(start, end),
                geodesy::bearing(p, end),
            );
            let backward = geodesy::cross_track(
                geodesy::distance(p, start),
                geodesy::bearing(end, start),
                geodesy::bearing(p, start),
            );
            if let (CrossTrack::Defined(xtk), true) = (forward, backward.is_defined()) {
                if xtk.abs() < best {
                    best = xtk.abs();
                    position = i + 1;
                }
            }
        }
        self.insert_waypoint(position, waypoint);
        position
    }

    pub fn remove_waypoint(&mut self, index: usize) -> Option<Waypoint> {
        if index >= self.waypoints.len() {
            return None;
        }
        let removed = self.waypoints.remove(index);
        self.recompute_distance();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.distance = 0.0;
    }

    /// Length of the path from waypoint `first` to waypoint `last`.
    pub fn distance_between(&self, first: usize, last: usize) -> f64 {
        if first >= last || last >= self.waypoints.len() {
            return 0.0;
        }
        self.waypoints[first..=last]
            .iter()
            .tuple_windows()
            .map(|(start, end)| geodesy::distance(&start.point, &end.point))
            .sum()
    }

    /// Course of the leg from waypoint `prev` to waypoint `next`.
    pub fn course(&self, prev: usize, next: usize) -> Option<f64> {
        let prev = self.waypoints.get(prev)?;
        let next = self.waypoints.get(next)?;
        Some(geodesy::bearing(&prev.point, &next.point))
    }

    fn recompute_distance(&mut self) {
        self.distance = self.distance_between(0, self.waypoints.len().saturating_sub(1));
    }
}
