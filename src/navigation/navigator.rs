use std::sync::Arc;

use anyhow::Result;

use crate::config::NavigationConfig;
use crate::error::EngineError;
use crate::geodesy::{self, CrossTrack};
use crate::gps_processor::Fix;
use crate::navigation::status::{NavigationStatus, VmgAverage};
use crate::navigation::{Direction, NavigationEvent, NavigationState};
use crate::route::{Route, Waypoint};

struct RouteProgress {
    route: Arc<Route>,
    direction: Direction,
    // raw index into the route of the waypoint being approached
    current: usize,
    previous: Option<usize>,
    course: Option<f64>,
    // cached `route_distance_left`, invalidated whenever the leg changes
    distance_left: Option<f64>,
}

impl RouteProgress {
    fn offset(&self, steps: isize) -> Option<usize> {
        let index = self.current as isize + steps * self.direction.step();
        if index >= 0 && (index as usize) < self.route.len() {
            Some(index as usize)
        } else {
            None
        }
    }

    fn waypoint(&self) -> &Waypoint {
        &self.route.waypoints()[self.current]
    }

    fn previous_waypoint(&self) -> Option<&Waypoint> {
        self.previous.and_then(|i| self.route.waypoint(i))
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.previous = self.offset(-1);
        self.course = self.previous.and_then(|prev| self.route.course(prev, index));
        self.distance_left = None;
    }
}

enum Target {
    Point(Waypoint),
    Route(RouteProgress),
}

/// Navigation state machine. It is fed commands and fixes one at a time and
/// answers each with the events the host should publish.
pub struct Navigator {
    config: NavigationConfig,
    target: Option<Target>,
    last_fix: Option<Fix>,
    vmg_average: VmgAverage,
    status: Option<NavigationStatus>,
}

impl Navigator {
    pub fn new(config: NavigationConfig) -> Self {
        let vmg_average = VmgAverage::new(config.vmg_window, config.vmg_sample_every);
        Navigator {
            config,
            target: None,
            last_fix: None,
            vmg_average,
            status: None,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: NavigationConfig) {
        if config.vmg_window != self.config.vmg_window
            || config.vmg_sample_every != self.config.vmg_sample_every
        {
            self.vmg_average = VmgAverage::new(config.vmg_window, config.vmg_sample_every);
        }
        self.config = config;
    }

    pub fn state(&self) -> NavigationState {
        match self.target {
            None => NavigationState::Idle,
            Some(Target::Point(_)) => NavigationState::NavigatingToPoint,
            Some(Target::Route(_)) => NavigationState::NavigatingRoute,
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.target.is_some()
    }

    pub fn status(&self) -> Option<&NavigationStatus> {
        self.status.as_ref()
    }

    pub fn last_fix(&self) -> Option<&Fix> {
        self.last_fix.as_ref()
    }

    pub fn current_waypoint(&self) -> Option<&Waypoint> {
        match &self.target {
            None => None,
            Some(Target::Point(waypoint)) => Some(waypoint),
            Some(Target::Route(progress)) => Some(progress.waypoint()),
        }
    }

    pub fn previous_waypoint(&self) -> Option<&Waypoint> {
        self.route_progress()
            .and_then(|progress| progress.previous_waypoint())
    }

    /// Course of the current leg, if there is a previous waypoint.
    pub fn course(&self) -> Option<f64> {
        self.route_progress().and_then(|progress| progress.course)
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route_progress().map(|progress| &progress.route)
    }

    pub fn direction(&self) -> Option<Direction> {
        self.route_progress().map(|progress| progress.direction)
    }

    /// Raw route index of the waypoint being approached.
    pub fn leg_index(&self) -> Option<usize> {
        self.route_progress().map(|progress| progress.current)
    }

    /// Effective proximity of the current waypoint.
    pub fn proximity(&self) -> f64 {
        let own = self.current_waypoint().map_or(0, |w| w.proximity);
        if own > 0 {
            own as f64
        } else {
            self.config.proximity as f64
        }
    }

    pub fn navigate_to_waypoint(&mut self, waypoint: Waypoint) -> Vec<NavigationEvent> {
        self.clear();
        info!("[navigation] navigating to waypoint '{}'", waypoint.name);
        self.target = Some(Target::Point(waypoint));
        self.started()
    }

    pub fn navigate_to_route(
        &mut self,
        route: Arc<Route>,
        direction: Direction,
    ) -> Result<Vec<NavigationEvent>> {
        if route.len() < 2 {
            bail!(EngineError::RouteTooShort { len: route.len() });
        }
        let first = match direction {
            Direction::Forward => 1,
            Direction::Reverse => route.len() - 2,
        };
        Ok(self.start_route(route, direction, first))
    }

    /// Like `navigate_to_route`, but heading to route index `index` right away.
    pub fn navigate_to_route_at(
        &mut self,
        route: Arc<Route>,
        direction: Direction,
        index: usize,
    ) -> Result<Vec<NavigationEvent>> {
        if route.len() < 2 {
            bail!(EngineError::RouteTooShort { len: route.len() });
        }
        if index >= route.len() {
            bail!(EngineError::NoSuchLeg {
                index: index as isize,
                len: route.len()
            });
        }
        Ok(self.start_route(route, direction, index))
    }

    pub fn set_route_waypoint(&mut self, index: usize) -> Result<Vec<NavigationEvent>> {
        let progress = self.route_progress_mut()?;
        if index >= progress.route.len() {
            bail!(EngineError::NoSuchLeg {
                index: index as isize,
                len: progress.route.len()
            });
        }
        progress.move_to(index);
        Ok(self.leg_changed())
    }

    pub fn next_route_waypoint(&mut self) -> Result<Vec<NavigationEvent>> {
        self.step_route_waypoint(1)
    }

    pub fn prev_route_waypoint(&mut self) -> Result<Vec<NavigationEvent>> {
        self.step_route_waypoint(-1)
    }

    /// Stopping while idle is a no-op and emits nothing.
    pub fn stop(&mut self) -> Vec<NavigationEvent> {
        if self.target.is_none() {
            return vec![];
        }
        info!("[navigation] stopped");
        self.clear();
        vec![NavigationEvent::Stopped]
    }

    pub fn has_next_route_waypoint(&self) -> bool {
        self.route_progress()
            .is_some_and(|progress| progress.offset(1).is_some())
    }

    pub fn has_prev_route_waypoint(&self) -> bool {
        self.route_progress()
            .is_some_and(|progress| progress.offset(-1).is_some())
    }

    /// The waypoint after the current one in traversal order.
    pub fn peek_next_route_waypoint(&self) -> Option<&Waypoint> {
        let progress = self.route_progress()?;
        progress.offset(1).and_then(|i| progress.route.waypoint(i))
    }

    /// Index of the current waypoint counted in traversal order.
    pub fn route_current_index(&self) -> Option<usize> {
        self.route_progress()
            .map(|progress| Self::traversal_index(progress, progress.current))
    }

    /// Distance from the current waypoint to the end of the route.
    pub fn route_distance_left(&mut self) -> f64 {
        let cached = match self.route_progress() {
            None => return 0.0,
            Some(progress) => progress.distance_left,
        };
        if let Some(distance) = cached {
            return distance;
        }
        let last = self.route_progress().map_or(0, |p| p.route.len() - 1);
        let distance = self.route_distance_left_to(last);
        if let Some(Target::Route(progress)) = &mut self.target {
            progress.distance_left = Some(distance);
        }
        distance
    }

    /// Distance from the current waypoint to the waypoint at traversal index
    /// `index`. Zero for waypoints already behind.
    pub fn route_distance_left_to(&self, index: usize) -> f64 {
        let Some(progress) = self.route_progress() else {
            return 0.0;
        };
        let current = Self::traversal_index(progress, progress.current);
        if index <= current {
            return 0.0;
        }
        let len = progress.route.len();
        match progress.direction {
            Direction::Forward => progress.route.distance_between(progress.current, index),
            Direction::Reverse => {
                progress
                    .route
                    .distance_between(len.saturating_sub(index + 1), progress.current)
            }
        }
    }

    /// Minutes needed to cover `distance` at the averaged VMG.
    pub fn route_ete(&self, distance: f64) -> Option<u32> {
        self.vmg_average.ete_minutes(distance)
    }

    pub fn route_ete_to(&self, index: usize) -> Option<u32> {
        let distance = self.route_distance_left_to(index);
        if distance <= 0.0 {
            return Some(0);
        }
        self.route_ete(distance)
    }

    /// Minutes needed for the single leg ending at traversal index `index`.
    pub fn route_waypoint_ete(&self, index: usize) -> Option<u32> {
        if index == 0 {
            return Some(0);
        }
        let progress = self.route_progress()?;
        let len = progress.route.len();
        if index >= len {
            return None;
        }
        let end = Self::raw_index(progress, index);
        let start = Self::raw_index(progress, index - 1);
        let distance = progress.route.distance_between(start.min(end), start.max(end));
        self.route_ete(distance)
    }

    pub fn on_fix(&mut self, fix: &Fix) -> Vec<NavigationEvent> {
        if !fix.is_valid() {
            debug!("[navigation] discarding invalid fix {:?}", fix.point);
            return Vec::new();
        }
        self.last_fix = Some(fix.clone());
        self.calculate_status()
    }

    fn calculate_status(&mut self) -> Vec<NavigationEvent> {
        let Some(fix) = self.last_fix.clone() else {
            return Vec::new();
        };
        let proximity = self.proximity();
        let (distance, bearing) = match self.current_waypoint() {
            None => return Vec::new(),
            Some(waypoint) => (
                geodesy::distance(&fix.point, &waypoint.point),
                geodesy::bearing(&fix.point, &waypoint.point),
            ),
        };
        let turn = geodesy::turn(fix.heading, bearing).round();
        let vmg = geodesy::vmg(fix.smoothed_speed, turn.abs());
        self.vmg_average
            .sample(geodesy::vmg(fix.averaged_speed, turn.abs()));
        let ete = self.vmg_average.ete_minutes(distance);

        let mut cross_track = CrossTrack::Undefined;
        match &self.target {
            None => return Vec::new(),
            Some(Target::Point(_)) => {
                if distance < proximity {
                    return self.reached();
                }
            }
            Some(Target::Route(progress)) => {
                let next = progress.offset(1);
                if distance < proximity {
                    return match next {
                        Some(index) => self.advance_to(index),
                        None => self.reached(),
                    };
                }
                if let Some(course) = progress.course {
                    cross_track = geodesy::cross_track(distance, course, bearing);
                    if !cross_track.is_defined() && self.config.traverse {
                        // Past the turn point: the fix is also outside the
                        // next leg's course as seen from the turn point.
                        if let Some(index) = next {
                            let passed = progress
                                .route
                                .course(progress.current, index)
                                .is_some_and(|next_course| {
                                    !geodesy::cross_track(0.0, next_course, bearing).is_defined()
                                });
                            if passed {
                                return self.advance_to(index);
                            }
                        }
                    }
                }
            }
        }

        self.vmg_average.tick();

        let status = NavigationStatus {
            distance,
            bearing,
            turn: turn as i32,
            vmg,
            ete,
            cross_track,
        };
        if self.status.as_ref() == Some(&status) {
            return Vec::new();
        }
        self.status = Some(status.clone());
        vec![NavigationEvent::StatusChanged(status)]
    }

    fn start_route(
        &mut self,
        route: Arc<Route>,
        direction: Direction,
        first: usize,
    ) -> Vec<NavigationEvent> {
        self.clear();
        info!(
            "[navigation] navigating route '{}' ({} waypoints, {})",
            route.name,
            route.len(),
            direction
        );
        let mut progress = RouteProgress {
            route,
            direction,
            current: first,
            previous: None,
            course: None,
            distance_left: None,
        };
        progress.move_to(first);
        self.target = Some(Target::Route(progress));
        self.started()
    }

    fn started(&mut self) -> Vec<NavigationEvent> {
        let mut events = vec![NavigationEvent::Started];
        events.extend(self.calculate_status());
        events
    }

    fn leg_changed(&mut self) -> Vec<NavigationEvent> {
        match self.leg_index() {
            None => Vec::new(),
            Some(index) => {
                debug!("[navigation] now heading to route waypoint {}", index);
                vec![NavigationEvent::LegAdvanced { index }]
            }
        }
    }

    fn advance_to(&mut self, index: usize) -> Vec<NavigationEvent> {
        if let Some(Target::Route(progress)) = &mut self.target {
            progress.move_to(index);
        }
        self.leg_changed()
    }

    fn reached(&mut self) -> Vec<NavigationEvent> {
        info!(
            "[navigation] reached '{}'",
            self.current_waypoint().map_or("", |w| w.name.as_str())
        );
        self.clear();
        vec![NavigationEvent::Reached]
    }

    fn step_route_waypoint(&mut self, steps: isize) -> Result<Vec<NavigationEvent>> {
        let progress = self.route_progress_mut()?;
        match progress.offset(steps) {
            Some(index) => {
                progress.move_to(index);
                Ok(self.leg_changed())
            }
            None => bail!(EngineError::NoSuchLeg {
                index: progress.current as isize + steps * progress.direction.step(),
                len: progress.route.len(),
            }),
        }
    }

    fn clear(&mut self) {
        self.target = None;
        self.status = None;
        self.vmg_average.reset();
    }

    fn route_progress(&self) -> Option<&RouteProgress> {
        match &self.target {
            Some(Target::Route(progress)) => Some(progress),
            _ => None,
        }
    }

    fn route_progress_mut(&mut self) -> Result<&mut RouteProgress> {
        match &mut self.target {
            Some(Target::Route(progress)) => Ok(progress),
            _ => bail!(EngineError::NotNavigatingRoute),
        }
    }

    fn traversal_index(progress: &RouteProgress, raw: usize) -> usize {
        match progress.direction {
            Direction::Forward => raw,
            Direction::Reverse => progress.route.len() - raw - 1,
        }
    }

    fn raw_index(progress: &RouteProgress, traversal: usize) -> usize {
        match progress.direction {
            Direction::Forward => traversal,
            Direction::Reverse => progress.route.len() - traversal - 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Point;
    use chrono::Utc;

    fn fix(latitude: f64, longitude: f64) -> Fix {
        Fix::new(Point::new(latitude, longitude), Utc::now())
    }

    fn route() -> Arc<Route> {
        Arc::new(Route::from_waypoints(
            "test",
            vec![
                Waypoint::new("A", 0.0, 0.0),
                Waypoint::new("B", 0.0, 0.1),
                Waypoint::new("C", 0.1, 0.1),
            ],
        ))
    }

    #[test]
    fn route_start_and_course() {
        let mut navigator = Navigator::new(NavigationConfig::default());
        navigator.navigate_to_route(route(), Direction::Forward).unwrap();
        assert_eq!(navigator.leg_index(), Some(1));
        assert_eq!(navigator.previous_waypoint().unwrap().name, "A");
        assert_eq!(navigator.course().map(f64::round), Some(90.0));

        navigator.navigate_to_route(route(), Direction::Reverse).unwrap();
        assert_eq!(navigator.leg_index(), Some(1));
        assert_eq!(navigator.previous_waypoint().unwrap().name, "C");
        assert_eq!(navigator.course().map(f64::round), Some(180.0));
        assert_eq!(navigator.route_current_index(), Some(1));
    }

    #[test]
    fn manual_leg_changes() {
        let mut navigator = Navigator::new(NavigationConfig::default());
        assert!(navigator.next_route_waypoint().is_err());
        navigator.navigate_to_route(route(), Direction::Forward).unwrap();

        assert_eq!(
            navigator.prev_route_waypoint().unwrap(),
            vec![NavigationEvent::LegAdvanced { index: 0 }]
        );
        assert!(navigator.previous_waypoint().is_none());
        assert_eq!(navigator.course(), None);
        let err = navigator.prev_route_waypoint().unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::NoSuchLeg { index: -1, len: 3 })
        );
        assert_eq!(navigator.leg_index(), Some(0));

        navigator.set_route_waypoint(2).unwrap();
        assert_eq!(navigator.previous_waypoint().unwrap().name, "B");
        assert!(!navigator.has_next_route_waypoint());
        assert!(navigator.next_route_waypoint().is_err());
        assert!(navigator.set_route_waypoint(3).is_err());
        assert_eq!(navigator.leg_index(), Some(2));
    }

    #[test]
    fn distance_left_in_both_directions() {
        let r = route();
        let mut navigator = Navigator::new(NavigationConfig::default());
        navigator.navigate_to_route(r.clone(), Direction::Forward).unwrap();
        let leg = r.distance_between(1, 2);
        assert!((navigator.route_distance_left() - leg).abs() < 1e-6);
        assert_eq!(navigator.route_distance_left_to(1), 0.0);

        navigator.navigate_to_route(r.clone(), Direction::Reverse).unwrap();
        let leg = r.distance_between(0, 1);
        assert!((navigator.route_distance_left() - leg).abs() < 1e-6);
        assert_eq!(navigator.route_ete_to(1), Some(0));
        // nothing averaged yet
        assert_eq!(navigator.route_ete(1000.0), None);
    }

    #[test]
    fn fix_before_navigation_is_used_on_start() {
        let mut navigator = Navigator::new(NavigationConfig::default());
        assert!(navigator.on_fix(&fix(0.0, 0.05)).is_empty());
        let events = navigator.navigate_to_waypoint(Waypoint::new("X", 0.0, 0.1));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], NavigationEvent::Started);
        assert!(matches!(events[1], NavigationEvent::StatusChanged(_)));
    }
}
