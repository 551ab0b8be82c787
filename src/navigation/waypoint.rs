//! Waypoint advance loop

use super::geo::distance_meters;
use super::{Advance, NavigationIo, NavigationState, ProgressWriter};
use crate::common::{GeoCoordinate, NotificationKind};
use crate::lifecycle::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// What one advance tick observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvanceTick {
    /// No active target; the list was already exhausted
    Finished,
    /// No position fix this tick
    NoFix,
    /// Still outside the tolerance radius
    Approaching { distance: f64 },
    /// Reached a waypoint and moved on to `index`
    Advanced { index: usize, target: GeoCoordinate },
    /// Reached the final waypoint
    Completed,
}

/// Moves the mission along its waypoint list as each one is reached
pub struct WaypointAdvanceLoop {
    state: Arc<NavigationState>,
    progress: ProgressWriter,
    io: NavigationIo,
    period: Duration,
    completion_grace: Duration,
}

impl WaypointAdvanceLoop {
    pub fn new(
        state: Arc<NavigationState>,
        progress: ProgressWriter,
        io: NavigationIo,
        period: Duration,
        completion_grace: Duration,
    ) -> Self {
        WaypointAdvanceLoop {
            state,
            progress,
            io,
            period,
            completion_grace,
        }
    }

    pub fn tick(&mut self) -> AdvanceTick {
        let Some(target) = self.state.active_target() else {
            return AdvanceTick::Finished;
        };
        let Some(position) = self.io.position.current_position() else {
            return AdvanceTick::NoFix;
        };

        let distance = distance_meters(&position, &target);
        if distance > self.state.waypoint_tolerance_meters() {
            log::debug!("{:.2} m to waypoint {}", distance, self.state.next_index());
            return AdvanceTick::Approaching { distance };
        }

        let reached = self.state.next_index();
        match self.progress.advance() {
            Advance::Next { index, target } => {
                log::info!("Waypoint {} reached, heading to {} ({})", reached, index, target);
                self.io.notifier.notify(
                    NotificationKind::Console,
                    None,
                    &format!("Waypoint {} reached, next {}", reached, target),
                );
                AdvanceTick::Advanced { index, target }
            }
            Advance::Completed => {
                log::info!("Final waypoint {} reached", reached);
                self.io.notifier.notify(
                    NotificationKind::Console,
                    None,
                    &format!("Final waypoint {} reached", reached),
                );
                AdvanceTick::Completed
            }
        }
    }

    /// Tick until every waypoint is reached or the token is cancelled.
    ///
    /// Reaching the final waypoint waits out the completion grace and then
    /// cancels `token`, which ends the sibling loops of the mission.
    pub async fn run(mut self, token: CancellationToken) {
        log::info!("Waypoint advance loop started ({:?} period)", self.period);
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
            match self.tick() {
                AdvanceTick::Completed => {
                    if token.sleep(self.completion_grace).await {
                        token.cancel();
                    }
                    break;
                }
                AdvanceTick::Finished => {
                    token.cancel();
                    break;
                }
                _ => {}
            }
        }
        log::info!("Waypoint advance loop stopped");
    }
}
