#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod config;
pub mod error;
pub mod geodesy;
pub mod gps_processor;
pub mod logs;
pub mod navigation;
pub mod route;
pub mod simplify;
pub mod track;

pub use config::Config;
pub use error::EngineError;
pub use geodesy::{CrossTrack, Point};
pub use gps_processor::Fix;
pub use navigation::{Direction, NavigationEvent, NavigationService, NavigationState, Navigator};
pub use route::{Route, Waypoint};
pub use simplify::{simplify, Simplifier, SimplifyOutcome, Strategy};
pub use track::Track;
