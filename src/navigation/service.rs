use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use crate::config::NavigationConfig;
use crate::gps_processor::Fix;
use crate::navigation::navigator::Navigator;
use crate::navigation::status::NavigationStatus;
use crate::navigation::{Direction, NavigationEvent, NavigationState};
use crate::route::{Route, Waypoint};

/// A point-in-time copy of what the navigator knows, for callers that poll
/// instead of subscribing.
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationSnapshot {
    pub state: NavigationState,
    pub status: Option<NavigationStatus>,
    pub current_waypoint: Option<String>,
    pub previous_waypoint: Option<String>,
    pub leg_index: Option<usize>,
    pub course: Option<f64>,
    /// Index of the current waypoint in traversal order.
    pub route_current_index: Option<usize>,
    pub route_distance_left: f64,
}

type Reply = Sender<Result<()>>;

enum Command {
    NavigateToWaypoint(Waypoint, Reply),
    NavigateToRoute {
        route: Arc<Route>,
        direction: Direction,
        start: Option<usize>,
        reply: Reply,
    },
    SetRouteWaypoint(usize, Reply),
    NextRouteWaypoint(Reply),
    PrevRouteWaypoint(Reply),
    Stop,
    Fix(Box<Fix>),
    UpdateConfig(NavigationConfig),
    Subscribe(Sender<NavigationEvent>),
    Snapshot(Sender<NavigationSnapshot>),
    Shutdown,
}

/// Runs a `Navigator` on its own thread. Fixes and commands may come from
/// any thread, they are queued and applied one at a time.
pub struct NavigationService {
    commands: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl NavigationService {
    pub fn start(config: NavigationConfig) -> Result<Self> {
        let (commands, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("navigation".into())
            .spawn(move || run(Navigator::new(config), rx))
            .context("failed to spawn navigation thread")?;
        Ok(NavigationService {
            commands,
            handle: Some(handle),
        })
    }

    pub fn navigate_to_waypoint(&self, waypoint: Waypoint) -> Result<()> {
        self.request(|reply| Command::NavigateToWaypoint(waypoint, reply))
    }

    /// Starts navigating `route`. With `start` the given route index becomes
    /// the current waypoint instead of the default second one.
    pub fn navigate_to_route(
        &self,
        route: Arc<Route>,
        direction: Direction,
        start: Option<usize>,
    ) -> Result<()> {
        self.request(|reply| Command::NavigateToRoute {
            route,
            direction,
            start,
            reply,
        })
    }

    pub fn set_route_waypoint(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::SetRouteWaypoint(index, reply))
    }

    pub fn next_route_waypoint(&self) -> Result<()> {
        self.request(Command::NextRouteWaypoint)
    }

    pub fn prev_route_waypoint(&self) -> Result<()> {
        self.request(Command::PrevRouteWaypoint)
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    pub fn on_fix(&self, fix: Fix) {
        self.send(Command::Fix(Box::new(fix)));
    }

    pub fn update_config(&self, config: NavigationConfig) {
        self.send(Command::UpdateConfig(config));
    }

    /// Events published after this call, in order. The receiver may be
    /// dropped at any time.
    pub fn subscribe(&self) -> Result<Receiver<NavigationEvent>> {
        let (tx, rx) = mpsc::channel();
        self.commands
            .send(Command::Subscribe(tx))
            .ok()
            .context("navigation thread is gone")?;
        Ok(rx)
    }

    pub fn snapshot(&self) -> Result<NavigationSnapshot> {
        let (tx, rx) = mpsc::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .ok()
            .context("navigation thread is gone")?;
        rx.recv().context("navigation thread is gone")
    }

    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn request<F>(&self, command: F) -> Result<()>
    where
        F: FnOnce(Reply) -> Command,
    {
        let (tx, rx) = mpsc::channel();
        self.commands
            .send(command(tx))
            .ok()
            .context("navigation thread is gone")?;
        rx.recv().context("navigation thread is gone")?
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("[navigation] command dropped, the worker has exited");
        }
    }

    fn stop_worker(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.commands.send(Command::Shutdown);
            if handle.join().is_err() {
                error!("[navigation] worker panicked");
            }
        }
    }
}

impl Drop for NavigationService {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run(mut navigator: Navigator, rx: Receiver<Command>) {
    info!("[navigation] worker started");
    let mut subscribers: Vec<Sender<NavigationEvent>> = Vec::new();

    while let Ok(command) = rx.recv() {
        let outcome = match command {
            Command::NavigateToWaypoint(waypoint, reply) => {
                Some((Ok(navigator.navigate_to_waypoint(waypoint)), reply))
            }
            Command::NavigateToRoute {
                route,
                direction,
                start,
                reply,
            } => Some((
                navigate_to_route(&mut navigator, route, direction, start),
                reply,
            )),
            Command::SetRouteWaypoint(index, reply) => {
                Some((navigator.set_route_waypoint(index), reply))
            }
            Command::NextRouteWaypoint(reply) => Some((navigator.next_route_waypoint(), reply)),
            Command::PrevRouteWaypoint(reply) => Some((navigator.prev_route_waypoint(), reply)),
            Command::Stop => {
                publish(&mut subscribers, navigator.stop());
                None
            }
            Command::Fix(fix) => {
                publish(&mut subscribers, navigator.on_fix(&fix));
                None
            }
            Command::UpdateConfig(config) => {
                navigator.update_config(config);
                None
            }
            Command::Subscribe(tx) => {
                subscribers.push(tx);
                None
            }
            Command::Snapshot(tx) => {
                let _ = tx.send(snapshot(&mut navigator));
                None
            }
            Command::Shutdown => break,
        };

        if let Some((result, reply)) = outcome {
            // Publish before replying so that a caller that subscribed earlier
            // finds the events queued once its command returns.
            let _ = reply.send(result.map(|events| publish(&mut subscribers, events)));
        }
    }
    info!("[navigation] worker stopped");
}

fn navigate_to_route(
    navigator: &mut Navigator,
    route: Arc<Route>,
    direction: Direction,
    start: Option<usize>,
) -> Result<Vec<NavigationEvent>> {
    match start {
        Some(index) => navigator.navigate_to_route_at(route, direction, index),
        None => navigator.navigate_to_route(route, direction),
    }
}

fn snapshot(navigator: &mut Navigator) -> NavigationSnapshot {
    NavigationSnapshot {
        state: navigator.state(),
        status: navigator.status().cloned(),
        current_waypoint: navigator.current_waypoint().map(|w| w.name.clone()),
        previous_waypoint: navigator.previous_waypoint().map(|w| w.name.clone()),
        leg_index: navigator.leg_index(),
        course: navigator.course(),
        route_current_index: navigator.route_current_index(),
        route_distance_left: navigator.route_distance_left(),
    }
}

fn publish(subscribers: &mut Vec<Sender<NavigationEvent>>, events: Vec<NavigationEvent>) {
    for event in events {
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
