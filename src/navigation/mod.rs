//! Navigation module for the rover
//!
//! `NavigationState` is the data of one mission. Each mutable field has a
//! single writer handle that is moved into the loop owning that field;
//! everyone else reads snapshots through one-slot watch channels and may see
//! a value up to one tick old.
pub mod direction;
pub mod drive;
pub mod geo;
pub mod mission;
pub mod waypoint;

use crate::common::{DriveDirection, GeoCoordinate, NotificationSink};
use crate::config::NavigationConfig;
use crate::control::CommandDispatcher;
use crate::perception::{HeadingSource, PositionSource};
use std::sync::Arc;
use tokio::sync::watch;

pub use self::direction::DirectionDecisionLoop;
pub use self::drive::DriveLoop;
pub use self::mission::{MissionController, MissionOutcome, MissionStatus};
pub use self::waypoint::WaypointAdvanceLoop;

/// External collaborators the mission loops talk to
#[derive(Clone)]
pub struct NavigationIo {
    pub position: Arc<dyn PositionSource>,
    pub heading: Arc<dyn HeadingSource>,
    pub dispatcher: Arc<dyn CommandDispatcher>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// Waypoint progression of a mission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointProgress {
    /// Index of the waypoint being pursued; -1 before the first advance,
    /// `waypoints.len()` once the list is exhausted
    pub next_index: i32,
    /// `Some` iff `0 <= next_index < waypoints.len()`
    pub active_target: Option<GeoCoordinate>,
}

impl WaypointProgress {
    fn initial() -> Self {
        WaypointProgress {
            next_index: -1,
            active_target: None,
        }
    }
}

/// Result of advancing to the next waypoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance {
    Next { index: usize, target: GeoCoordinate },
    Completed,
}

/// Data of one mission
#[derive(Debug)]
pub struct NavigationState {
    waypoints: Arc<[GeoCoordinate]>,
    waypoint_tolerance_meters: f64,
    heading_tolerance_degrees: f64,
    progress: watch::Receiver<WaypointProgress>,
    direction: watch::Receiver<DriveDirection>,
    position: watch::Receiver<Option<GeoCoordinate>>,
}

/// Writer handles for a fresh [`NavigationState`]
#[derive(Debug)]
pub struct StateWriters {
    pub progress: ProgressWriter,
    pub direction: DirectionWriter,
    pub position: PositionWriter,
}

impl NavigationState {
    /// Create the state of a new mission and its writer handles
    pub fn new(waypoints: Vec<GeoCoordinate>, config: &NavigationConfig) -> (Self, StateWriters) {
        let waypoints: Arc<[GeoCoordinate]> = waypoints.into();
        let (progress_tx, progress_rx) = watch::channel(WaypointProgress::initial());
        let (direction_tx, direction_rx) = watch::channel(DriveDirection::default());
        let (position_tx, position_rx) = watch::channel(None);

        let state = NavigationState {
            waypoints: Arc::clone(&waypoints),
            waypoint_tolerance_meters: config.waypoint_tolerance_meters,
            heading_tolerance_degrees: config.heading_tolerance_degrees,
            progress: progress_rx,
            direction: direction_rx,
            position: position_rx,
        };
        let writers = StateWriters {
            progress: ProgressWriter {
                tx: progress_tx,
                waypoints,
            },
            direction: DirectionWriter { tx: direction_tx },
            position: PositionWriter { tx: position_tx },
        };
        (state, writers)
    }

    pub fn waypoints(&self) -> &[GeoCoordinate] {
        &self.waypoints
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoint_tolerance_meters(&self) -> f64 {
        self.waypoint_tolerance_meters
    }

    pub fn heading_tolerance_degrees(&self) -> f64 {
        self.heading_tolerance_degrees
    }

    /// Snapshot of the waypoint progression
    pub fn progress(&self) -> WaypointProgress {
        *self.progress.borrow()
    }

    pub fn next_index(&self) -> i32 {
        self.progress().next_index
    }

    pub fn active_target(&self) -> Option<GeoCoordinate> {
        self.progress().active_target
    }

    /// Last position seen by the direction loop
    pub fn current_position(&self) -> Option<GeoCoordinate> {
        *self.position.borrow()
    }

    pub fn drive_direction(&self) -> DriveDirection {
        *self.direction.borrow()
    }

    /// Whether every waypoint has been reached
    pub fn is_complete(&self) -> bool {
        let progress = self.progress();
        progress.active_target.is_none() && progress.next_index as usize == self.waypoints.len()
    }
}

/// Sole writer of `next_index` / `active_target`
#[derive(Debug)]
pub struct ProgressWriter {
    tx: watch::Sender<WaypointProgress>,
    waypoints: Arc<[GeoCoordinate]>,
}

impl ProgressWriter {
    /// Move on to the next waypoint.
    ///
    /// Once the list is exhausted further calls keep returning
    /// `Completed` without touching the index.
    pub fn advance(&mut self) -> Advance {
        let current = *self.tx.borrow();
        let len = self.waypoints.len() as i32;
        if current.next_index >= len {
            return Advance::Completed;
        }

        let next_index = current.next_index + 1;
        let active_target = self.waypoints.get(next_index as usize).copied();
        self.tx.send_replace(WaypointProgress {
            next_index,
            active_target,
        });

        match active_target {
            Some(target) => Advance::Next {
                index: next_index as usize,
                target,
            },
            None => Advance::Completed,
        }
    }
}

/// Sole writer of `drive_direction`
#[derive(Debug)]
pub struct DirectionWriter {
    tx: watch::Sender<DriveDirection>,
}

impl DirectionWriter {
    pub fn set(&self, direction: DriveDirection) {
        self.tx.send_replace(direction);
    }
}

/// Sole writer of `current_position`
#[derive(Debug)]
pub struct PositionWriter {
    tx: watch::Sender<Option<GeoCoordinate>>,
}

impl PositionWriter {
    pub fn record(&self, position: GeoCoordinate) {
        self.tx.send_replace(Some(position));
    }
}
