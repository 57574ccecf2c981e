use crate::geodesy::CrossTrack;

/// Everything a display needs about the current target, recomputed from the
/// latest fix.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationStatus {
    /// Meters to the current waypoint.
    pub distance: f64,
    /// Degrees, [0, 360).
    pub bearing: f64,
    /// Whole degrees from the direction of travel to the bearing, negative
    /// means turn left.
    pub turn: i32,
    /// Velocity made good in m/s.
    pub vmg: f64,
    /// Minutes to the current waypoint, `None` while the average VMG is not
    /// positive.
    pub ete: Option<u32>,
    pub cross_track: CrossTrack,
}

/// Rolling average of VMG used for ETE. The window is zero-filled at start,
/// and takes a new sample only on every `sample_every`-th fix (or while the
/// average is still zero) so that short fluctuations do not make the ETE jump.
#[derive(Clone, Debug)]
pub struct VmgAverage {
    samples: Vec<f64>,
    next: usize,
    average: f64,
    fixes: u64,
    sample_every: u64,
}

impl VmgAverage {
    pub fn new(window: usize, sample_every: u32) -> Self {
        VmgAverage {
            samples: vec![0.0; window.max(1)],
            next: 0,
            average: 0.0,
            fixes: 0,
            sample_every: u64::from(sample_every.max(1)),
        }
    }

    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.next = 0;
        self.average = 0.0;
        self.fixes = 0;
    }

    pub fn sample(&mut self, vmg: f64) {
        if self.average == 0.0 || self.fixes % self.sample_every == 0 {
            self.samples[self.next] = vmg;
            self.next = (self.next + 1) % self.samples.len();
            self.average = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        }
    }

    /// Counts a fully processed fix.
    pub fn tick(&mut self) {
        self.fixes += 1;
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn ete_minutes(&self, distance: f64) -> Option<u32> {
        if self.average > 0.0 {
            Some((distance / self.average / 60.0).round() as u32)
        } else {
            None
        }
    }
}
