use chrono::{DateTime, Utc};

use crate::config::RecordingConfig;
use crate::geodesy::Point;
use crate::track::{Track, TrackPoint};

/// One position sample as delivered by the location provider. Speeds are in
/// m/s, the heading is the direction of travel in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct Fix {
    pub point: Point,
    pub speed: f64,
    pub smoothed_speed: f64,
    pub averaged_speed: f64,
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn new(point: Point, timestamp: DateTime<Utc>) -> Self {
        Fix {
            point,
            speed: 0.0,
            smoothed_speed: 0.0,
            averaged_speed: 0.0,
            heading: 0.0,
            timestamp,
        }
    }

    /// Same speed for the instantaneous, smoothed and averaged readings.
    pub fn with_motion(mut self, speed: f64, heading: f64) -> Self {
        self.speed = speed;
        self.smoothed_speed = speed;
        self.averaged_speed = speed;
        self.heading = heading;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.point.is_valid()
            && self.speed.is_finite()
            && self.smoothed_speed.is_finite()
            && self.averaged_speed.is_finite()
            && self.heading.is_finite()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum ProcessResult {
    Append = 0,
    NewSegment = 1,
    // negative values are for fixes that should not be recorded at all.
    Ignore = -1,
}

impl ProcessResult {
    pub fn to_int(&self) -> i8 {
        *self as i8
    }
}

/// Decides how an incoming fix relates to the previous one when recording a
/// track.
pub struct GpsProcessor {
    last_fix: Option<Fix>,
    segment_gap_ms: i64,
}

impl GpsProcessor {
    pub fn new(config: &RecordingConfig) -> Self {
        GpsProcessor {
            last_fix: None,
            segment_gap_ms: config.segment_gap_ms,
        }
    }

    pub fn last_fix(&self) -> Option<&Fix> {
        self.last_fix.as_ref()
    }

    pub fn preprocess(&mut self, fix: &Fix) -> ProcessResult {
        let result = if !fix.is_valid() {
            ProcessResult::Ignore
        } else {
            match &self.last_fix {
                None => ProcessResult::NewSegment,
                Some(last_fix) => {
                    let time_diff_in_ms = (fix.timestamp - last_fix.timestamp).num_milliseconds();
                    if time_diff_in_ms < 0 {
                        // Late deliveries would fold the track back on itself,
                        // so they are dropped.
                        ProcessResult::Ignore
                    } else if time_diff_in_ms > self.segment_gap_ms {
                        ProcessResult::NewSegment
                    } else {
                        ProcessResult::Append
                    }
                }
            }
        };
        if result != ProcessResult::Ignore {
            self.last_fix = Some(fix.clone());
        }
        result
    }

    /// Classifies the fix and appends it to `track` unless it is ignored.
    pub fn record(&mut self, track: &mut Track, fix: &Fix) -> ProcessResult {
        let result = self.preprocess(fix);
        if result != ProcessResult::Ignore {
            let mut point = fix.point.clone();
            point.timestamp.get_or_insert(fix.timestamp);
            track.add_track_point(TrackPoint {
                point,
                speed: Some(fix.speed),
                continuous: result == ProcessResult::Append,
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::gps_processor::ProcessResult;

    #[test]
    fn to_int() {
        assert_eq!(ProcessResult::NewSegment.to_int(), 1);
        assert_eq!(ProcessResult::Ignore.to_int(), -1);
    }
}
