//! Direction decision loop
//!
//! Every tick turns (position, heading, active target) into a drive
//! direction. A missing input skips the tick and the previous direction
//! stays in effect.

use super::geo::bearing_degrees;
use super::{DirectionWriter, NavigationIo, NavigationState, PositionWriter};
use crate::common::{DriveDirection, NotificationKind};
use crate::control::HeadingController;
use crate::lifecycle::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Periodic steering decision for the active waypoint
pub struct DirectionDecisionLoop {
    state: Arc<NavigationState>,
    direction: DirectionWriter,
    position: PositionWriter,
    io: NavigationIo,
    controller: HeadingController,
    period: Duration,
}

impl DirectionDecisionLoop {
    pub fn new(
        state: Arc<NavigationState>,
        direction: DirectionWriter,
        position: PositionWriter,
        io: NavigationIo,
        period: Duration,
    ) -> Self {
        let controller = HeadingController::new(state.heading_tolerance_degrees());
        DirectionDecisionLoop {
            state,
            direction,
            position,
            io,
            controller,
            period,
        }
    }

    /// Run one decision; returns the direction written, if any
    pub fn tick(&mut self) -> Option<DriveDirection> {
        let Some(position) = self.io.position.current_position() else {
            log::debug!("No position fix, keeping {}", self.state.drive_direction());
            return None;
        };
        self.position.record(position);

        let target = self.state.active_target()?;

        let Some(heading) = self.io.heading.current_heading_degrees() else {
            log::debug!("No compass heading, keeping {}", self.state.drive_direction());
            return None;
        };

        let bearing = bearing_degrees(&position, &target);
        let direction = self.controller.compute_direction(bearing, heading);
        self.direction.set(direction);

        log::debug!(
            "bearing={:.1} heading={:.1} error={:.1} -> {}",
            bearing,
            heading,
            self.controller.heading_error(bearing, heading),
            direction
        );
        self.io.notifier.notify(
            NotificationKind::Console,
            None,
            &format!("Navigating {} (bearing {:.1}, heading {:.1})", direction, bearing, heading),
        );

        Some(direction)
    }

    /// Tick until the mission token is cancelled
    pub async fn run(mut self, token: CancellationToken) {
        log::info!("Direction decision loop started ({:?} period)", self.period);
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if token.is_cancelled() {
                break;
            }
            self.tick();
        }
        log::info!("Direction decision loop stopped");
    }
}
