use thiserror::Error;

/// Domain failures of the engine. They travel inside `anyhow::Error`, use
/// `err.downcast_ref::<EngineError>()` to match on them.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("route too short: {len} waypoint(s), need at least 2")]
    RouteTooShort { len: usize },

    #[error("track too short: {len} point(s), need at least 2")]
    TrackTooShort { len: usize },

    #[error("no such leg: index {index} in a route of {len}")]
    NoSuchLeg { index: isize, len: usize },

    #[error("not navigating a route")]
    NotNavigatingRoute,

    #[error("simplification tolerance must be finite and positive")]
    InvalidTolerance,

    #[error("cancelled")]
    Cancelled,
}
