//! Drive loop: re-asserts the decided direction on every tick

use super::{NavigationIo, NavigationState};
use crate::common::DriveDirection;
use crate::control::{DriveCommand, DriveOverride};
use crate::lifecycle::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Drive command for a decided direction; `Stop` has none
pub fn command_for(direction: DriveDirection) -> Option<DriveCommand> {
    match direction {
        DriveDirection::Forward => Some(DriveCommand::DriveForward),
        DriveDirection::Reverse => Some(DriveCommand::DriveReverse),
        DriveDirection::Left => Some(DriveCommand::DriveLeft),
        DriveDirection::Right => Some(DriveCommand::DriveRight),
        DriveDirection::Stop => None,
    }
}

pub struct DriveLoop {
    state: Arc<NavigationState>,
    io: NavigationIo,
    drive_override: DriveOverride,
    period: Duration,
}

impl DriveLoop {
    pub fn new(
        state: Arc<NavigationState>,
        io: NavigationIo,
        drive_override: DriveOverride,
        period: Duration,
    ) -> Self {
        DriveLoop {
            state,
            io,
            drive_override,
            period,
        }
    }

    /// Issue "normal speed" and the drive command for the current
    /// direction. Nothing is sent while obstacle avoidance holds the wheels.
    pub fn tick(&self) -> Option<DriveCommand> {
        if self.drive_override.is_active() {
            log::debug!("Obstacle override active, not re-asserting drive");
            return None;
        }
        let command = command_for(self.state.drive_direction())?;
        self.io.dispatcher.execute(DriveCommand::SpeedNormal);
        self.io.dispatcher.execute(command);
        Some(command)
    }

    pub async fn run(self, token: CancellationToken) {
        log::info!("Drive loop started ({:?} period)", self.period);
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
        log::info!("Drive loop stopped");
    }
}
