/* Host-provided settings. Every field has a default so a partial JSON document
(or none at all) is enough to get going.
*/
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::simplify::Strategy;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub navigation: NavigationConfig,
    pub simplify: SimplifyConfig,
    pub recording: RecordingConfig,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Config> {
        let config = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json_str(&content)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Radius in meters within which a waypoint counts as reached, used when
    /// the waypoint itself does not carry one.
    pub proximity: u32,
    /// Advance to the next leg once the turn point has been passed, even if
    /// we never got within `proximity` of it.
    pub traverse: bool,
    /// Number of samples in the VMG rolling average used for ETE.
    pub vmg_window: usize,
    /// The rolling average takes a new sample on every n-th processed fix.
    pub vmg_sample_every: u32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            proximity: 200,
            traverse: true,
            vmg_window: 20,
            vmg_sample_every: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyConfig {
    pub strategy: Strategy,
    /// Accumulated heading change (degrees) that marks a candidate turn.
    pub turn_threshold: f64,
    /// A candidate turn is committed once the deviation exceeds
    /// `turn_commit_factor * tolerance`.
    pub turn_commit_factor: f64,
    /// Straight legs are split after `max_leg_factor * tolerance` meters.
    pub max_leg_factor: f64,
    /// Upper bound on waypoints inserted by peak insertion.
    pub max_iterations: usize,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        SimplifyConfig {
            strategy: Strategy::default(),
            turn_threshold: 10.0,
            turn_commit_factor: 3.0,
            max_leg_factor: 200.0,
            max_iterations: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Fixes further apart than this start a new track segment.
    pub segment_gap_ms: i64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        RecordingConfig {
            segment_gap_ms: 5 * 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json_str(
            r#"{ "navigation": { "proximity": 50 }, "simplify": { "strategy": "turn_scan" } }"#,
        )
        .unwrap();
        assert_eq!(config.navigation.proximity, 50);
        assert!(config.navigation.traverse);
        assert_eq!(config.navigation.vmg_window, 20);
        assert_eq!(config.simplify.strategy, Strategy::TurnScan);
        assert_eq!(config.simplify.max_iterations, 500);
        assert_eq!(config.recording, RecordingConfig::default());
    }

    #[test]
    fn empty_document() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
        assert!(Config::from_json_str("not json").is_err());
    }
}
