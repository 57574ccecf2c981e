use crate::geodesy::{self, Point};

#[derive(Clone, Debug, PartialEq)]
pub struct TrackPoint {
    pub point: Point,
    pub speed: Option<f64>,
    // `false` means there is a gap between this point and the previous one, so
    // nothing should be drawn or interpolated across it.
    pub continuous: bool,
}

/// A recorded path. Points are only ever appended, except through the explicit
/// trim operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    pub name: String,
    pub description: String,
    pub show: bool,
    /// `0` means unbounded, otherwise the oldest point is dropped once the
    /// track grows past this.
    pub max_points: usize,
    track_points: Vec<TrackPoint>,
    distance: f64,
}

impl Track {
    pub fn new(name: &str) -> Self {
        Track {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_max_points(name: &str, max_points: usize) -> Self {
        Track {
            max_points,
            ..Track::new(name)
        }
    }

    pub fn from_points(name: &str, points: impl IntoIterator<Item = Point>) -> Self {
        let mut track = Track::new(name);
        for point in points {
            track.add_point(true, point);
        }
        track
    }

    pub fn add_point(&mut self, continuous: bool, point: Point) {
        self.add_track_point(TrackPoint {
            point,
            speed: None,
            continuous,
        });
    }

    pub fn add_track_point(&mut self, track_point: TrackPoint) {
        if let Some(last) = self.track_points.last() {
            self.distance += geodesy::distance(&last.point, &track_point.point);
        }
        self.track_points.push(track_point);
        if self.max_points > 0 && self.track_points.len() > self.max_points {
            let removed = self.track_points.remove(0);
            self.distance -= geodesy::distance(&removed.point, &self.track_points[0].point);
        }
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.track_points
    }

    pub fn point(&self, index: usize) -> Option<&TrackPoint> {
        self.track_points.get(index)
    }

    pub fn last_point(&self) -> Option<&TrackPoint> {
        self.track_points.last()
    }

    pub fn len(&self) -> usize {
        self.track_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_points.is_empty()
    }

    /// Total length in meters.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Keeps points `0..=index`.
    pub fn cut_after(&mut self, index: usize) {
        if index + 1 < self.track_points.len() {
            self.track_points.truncate(index + 1);
            self.recompute_distance();
        }
    }

    /// Keeps points `index..`.
    pub fn cut_before(&mut self, index: usize) {
        let index = index.min(self.track_points.len());
        if index > 0 {
            self.track_points.drain(..index);
            self.recompute_distance();
        }
    }

    pub fn clear(&mut self) {
        self.track_points.clear();
        self.distance = 0.0;
    }

    fn recompute_distance(&mut self) {
        self.distance = self
            .track_points
            .windows(2)
            .map(|pair| geodesy::distance(&pair[0].point, &pair[1].point))
            .sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Track {
        Track::from_points("line", (0..n).map(|i| Point::new(0.0, i as f64 * 0.001)))
    }

    #[test]
    fn distance_follows_trims() {
        let mut track = line(5);
        let full = track.distance();
        assert!(full > 0.0);
        track.cut_after(2);
        assert_eq!(track.len(), 3);
        assert!((track.distance() - full / 2.0).abs() < 1e-6);
        track.cut_before(1);
        assert_eq!(track.len(), 2);
        assert_eq!(track.point(0).unwrap().point.longitude, 0.001);
        track.clear();
        assert!(track.is_empty());
        assert_eq!(track.distance(), 0.0);
    }

    #[test]
    fn max_points_drops_oldest() {
        let mut track = Track::with_max_points("capped", 3);
        for i in 0..5 {
            track.add_point(true, Point::new(0.0, i as f64 * 0.001));
        }
        assert_eq!(track.len(), 3);
        assert_eq!(track.point(0).unwrap().point.longitude, 0.002);
        let expected = line(3).distance();
        assert!((track.distance() - expected).abs() < 1e-6);
    }
}
