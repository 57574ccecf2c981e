/* The navigation engine. `Navigator` is the synchronous state machine, and
`NavigationService` runs one on a dedicated thread so fixes and commands coming
from different places are applied strictly one after another.
*/
pub mod navigator;
pub mod service;
pub mod status;

use strum_macros::Display;

pub use navigator::Navigator;
pub use service::{NavigationService, NavigationSnapshot};
pub use status::{NavigationStatus, VmgAverage};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum NavigationState {
    Idle,
    NavigatingToPoint,
    NavigatingRoute,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn step(&self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NavigationEvent {
    Started,
    /// The waypoint at route index `index` is now the one being approached.
    LegAdvanced {
        index: usize,
    },
    Reached,
    Stopped,
    StatusChanged(NavigationStatus),
}
