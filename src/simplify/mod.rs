/* Track to route conversion. A recorded track is reduced to the few points
where it actually changes direction, so that following straight legs between
them never strays further than `proximity * sensitivity` meters from where the
track went.

Both strategies only pick track indices; turning those into a `Route` is done
here so the output naming is the same regardless of the strategy.
*/
mod peak_insertion;
mod turn_scan;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::config::{Config, SimplifyConfig};
use crate::error::EngineError;
use crate::geodesy::Point;
use crate::route::{Route, Waypoint};
use crate::track::Track;

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Single forward pass that commits a waypoint once a turn has taken the
    /// track far enough off the previous leg.
    TurnScan,
    /// Starts from the two end points and keeps splitting legs at the point of
    /// largest cross-track error until every leg is within tolerance.
    #[default]
    PeakInsertion,
}

#[derive(Clone, Debug)]
pub struct SimplifyOutcome {
    pub route: Route,
    /// False when leg splitting hit its iteration cap before every leg was
    /// within tolerance.
    pub converged: bool,
}

pub struct Simplifier {
    config: SimplifyConfig,
    proximity: u32,
    cancel: Option<Arc<AtomicBool>>,
}

impl Simplifier {
    /// `proximity` is the navigation proximity in meters, the tolerance is
    /// derived from it.
    pub fn new(config: SimplifyConfig, proximity: u32) -> Self {
        Simplifier {
            config,
            proximity,
            cancel: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.simplify.clone(), config.navigation.proximity)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Setting the flag makes a running `run` give up with
    /// `EngineError::Cancelled`.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn tolerance(&self, sensitivity: f64) -> f64 {
        self.proximity as f64 * sensitivity
    }

    pub fn run(&self, track: &Track, sensitivity: f64) -> Result<SimplifyOutcome> {
        if track.len() < 2 {
            bail!(EngineError::TrackTooShort { len: track.len() });
        }
        let tolerance = self.tolerance(sensitivity);
        if !tolerance.is_finite() || tolerance <= 0.0 {
            bail!(EngineError::InvalidTolerance);
        }
        let points: Vec<&Point> = track.points().iter().map(|p| &p.point).collect();
        let context = Context {
            config: &self.config,
            tolerance,
            cancel: self.cancel.as_deref(),
        };

        let (indices, converged, proximity) = match self.config.strategy {
            Strategy::TurnScan => {
                let (indices, converged) = turn_scan::run(&points, &context)?;
                (indices, converged, 0)
            }
            Strategy::PeakInsertion => {
                let (indices, converged) = peak_insertion::run(&points, &context)?;
                (indices, converged, self.proximity)
            }
        };
        if !converged {
            warn!(
                "[simplify] '{}' did not converge within {} insertions",
                track.name, self.config.max_iterations
            );
        }
        info!(
            "[simplify] '{}': {} points -> {} waypoints ({}, tolerance {:.1}m)",
            track.name,
            track.len(),
            indices.len(),
            self.config.strategy,
            tolerance
        );

        let waypoints = indices
            .iter()
            .enumerate()
            .map(|(n, &i)| {
                Waypoint::at(&format!("RWPT{}", n), points[i].clone()).with_proximity(proximity)
            })
            .collect();
        let mut route = Route::from_waypoints(&format!("RT_{}", track.name), waypoints);
        route.show = true;
        Ok(SimplifyOutcome { route, converged })
    }
}

/// Simplifies with the default configuration.
pub fn simplify(track: &Track, sensitivity: f64) -> Result<Route> {
    let outcome = Simplifier::from_config(&Config::default()).run(track, sensitivity)?;
    Ok(outcome.route)
}

struct Context<'a> {
    config: &'a SimplifyConfig,
    tolerance: f64,
    cancel: Option<&'a AtomicBool>,
}

impl Context<'_> {
    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            bail!(EngineError::Cancelled);
        }
        Ok(())
    }
}
