//! Mission controller
//!
//! Owns the cancellation scope of a mission: the direction, advance and
//! drive loops run as three tasks sharing one token, and a supervisor task
//! joins them, stops the rover and reports how the mission ended.

use super::direction::DirectionDecisionLoop;
use super::drive::DriveLoop;
use super::geo::distance_meters;
use super::waypoint::WaypointAdvanceLoop;
use super::{Advance, NavigationIo, NavigationState};
use crate::common::{DriveDirection, GeoCoordinate, NotificationKind};
use crate::config::NavigationConfig;
use crate::control::{DriveCommand, DriveOverride};
use crate::error::{MissionError, Result};
use crate::lifecycle::{CancellationToken, LifecycleNode, LifecycleNodeBase, State};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinSet;

/// How a mission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionOutcome {
    /// Every waypoint was reached
    Completed,
    /// Cancelled before the last waypoint
    Aborted,
}

impl fmt::Display for MissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionOutcome::Completed => f.write_str("completed"),
            MissionOutcome::Aborted => f.write_str("aborted"),
        }
    }
}

/// Read-only view of the current (or last) mission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionStatus {
    pub active: bool,
    pub next_index: i32,
    pub waypoint_count: usize,
    pub target: Option<GeoCoordinate>,
    pub position: Option<GeoCoordinate>,
    pub distance_to_target_meters: Option<f64>,
    pub direction: DriveDirection,
}

impl MissionStatus {
    fn idle() -> Self {
        MissionStatus {
            active: false,
            next_index: -1,
            waypoint_count: 0,
            target: None,
            position: None,
            distance_to_target_meters: None,
            direction: DriveDirection::Stop,
        }
    }
}

struct MissionRecord {
    id: u64,
    state: Arc<NavigationState>,
    token: CancellationToken,
    outcome: watch::Receiver<Option<MissionOutcome>>,
}

impl MissionRecord {
    fn is_running(&self) -> bool {
        self.outcome.borrow().is_none()
    }
}

/// Starts, supervises and cancels waypoint missions
pub struct MissionController {
    base: LifecycleNodeBase,
    config: NavigationConfig,
    io: NavigationIo,
    drive_override: DriveOverride,
    current: Mutex<Option<MissionRecord>>,
    next_id: AtomicU64,
}

impl MissionController {
    pub fn new(config: NavigationConfig, io: NavigationIo, drive_override: DriveOverride) -> Self {
        MissionController {
            base: LifecycleNodeBase::new("mission_controller"),
            config,
            io,
            drive_override,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn record(&self) -> MutexGuard<'_, Option<MissionRecord>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a mission over `waypoints`, visited in order.
    ///
    /// Rejected when the list is empty, the controller is not active, or
    /// another mission is still running.
    /// On success the first waypoint is already the active target and the
    /// three mission loops are running.
    pub async fn start_mission(
        &self,
        waypoints: Vec<GeoCoordinate>,
    ) -> std::result::Result<(), MissionError> {
        if waypoints.is_empty() {
            return Err(MissionError::EmptyWaypointList);
        }
        if self.base.get_state() != State::Active {
            log::warn!("{} is not active, ignoring mission", self.base.name);
            return Err(MissionError::NotActive);
        }

        let mut current = self.record();
        if current.as_ref().is_some_and(MissionRecord::is_running) {
            return Err(MissionError::MissionAlreadyActive);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (state, mut writers) = NavigationState::new(waypoints, &self.config);
        if let Advance::Next { target, .. } = writers.progress.advance() {
            log::info!(
                "Mission {} started: {} waypoints, first {}",
                id,
                state.waypoint_count(),
                target
            );
        }
        let state = Arc::new(state);
        let token = CancellationToken::new();
        let (outcome_tx, outcome_rx) = watch::channel(None);

        self.io
            .notifier
            .notify(NotificationKind::ControlMode, None, "Navigation");
        self.io.notifier.notify(
            NotificationKind::Console,
            None,
            &format!("Mission started with {} waypoints", state.waypoint_count()),
        );
        self.io.dispatcher.execute(DriveCommand::SpeedNormal);

        let mut tasks = JoinSet::new();
        tasks.spawn(
            DirectionDecisionLoop::new(
                state.clone(),
                writers.direction,
                writers.position,
                self.io.clone(),
                self.config.decision_period(),
            )
            .run(token.clone()),
        );
        tasks.spawn(
            WaypointAdvanceLoop::new(
                state.clone(),
                writers.progress,
                self.io.clone(),
                self.config.advance_period(),
                self.config.completion_grace(),
            )
            .run(token.clone()),
        );
        tasks.spawn(
            DriveLoop::new(
                state.clone(),
                self.io.clone(),
                self.drive_override.clone(),
                self.config.drive_period(),
            )
            .run(token.clone()),
        );

        tokio::spawn(supervise(
            id,
            tasks,
            state.clone(),
            token.clone(),
            self.io.clone(),
            outcome_tx,
        ));

        *current = Some(MissionRecord {
            id,
            state,
            token,
            outcome: outcome_rx,
        });
        Ok(())
    }

    /// Request cancellation of the running mission, if any.
    ///
    /// Returns immediately; the loops stop within one tick and the
    /// supervisor then parks the rover.
    pub fn cancel_mission(&self) {
        if let Some(record) = self.record().as_ref() {
            if record.is_running() && !record.token.is_cancelled() {
                log::info!("Cancelling mission {}", record.id);
                record.token.cancel();
            }
        }
    }

    /// Wait for the current mission to end.
    ///
    /// `None` when no mission was ever started.
    pub async fn wait(&self) -> Option<MissionOutcome> {
        let mut outcome = self.record().as_ref()?.outcome.clone();
        if outcome.wait_for(Option::is_some).await.is_err() {
            log::warn!("Mission supervisor ended without an outcome");
        }
        let result = *outcome.borrow();
        result
    }

    pub fn is_active(&self) -> bool {
        self.record().as_ref().is_some_and(MissionRecord::is_running)
    }

    /// Target currently pursued; `None` when idle or finished
    pub fn current_target(&self) -> Option<GeoCoordinate> {
        self.record()
            .as_ref()
            .filter(|record| record.is_running())
            .and_then(|record| record.state.active_target())
    }

    /// Meters from the latest position fix to the current target
    pub fn distance_to_target(&self) -> Option<f64> {
        self.status().distance_to_target_meters
    }

    pub fn status(&self) -> MissionStatus {
        let current = self.record();
        let Some(record) = current.as_ref() else {
            return MissionStatus::idle();
        };

        let state = &record.state;
        let active = record.is_running();
        let target = if active { state.active_target() } else { None };
        let position = self
            .io
            .position
            .current_position()
            .or_else(|| state.current_position());
        let distance_to_target_meters = match (position, target) {
            (Some(position), Some(target)) => Some(distance_meters(&position, &target)),
            _ => None,
        };

        MissionStatus {
            active,
            next_index: state.next_index(),
            waypoint_count: state.waypoint_count(),
            target,
            position,
            distance_to_target_meters,
            direction: if active {
                state.drive_direction()
            } else {
                DriveDirection::Stop
            },
        }
    }
}

impl Drop for MissionController {
    fn drop(&mut self) {
        self.cancel_mission();
    }
}

/// Join the mission loops, then stop the rover exactly once
async fn supervise(
    id: u64,
    mut tasks: JoinSet<()>,
    state: Arc<NavigationState>,
    token: CancellationToken,
    io: NavigationIo,
    outcome_tx: watch::Sender<Option<MissionOutcome>>,
) {
    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            log::error!("Mission {} task failed: {}", id, e);
            token.cancel();
        }
    }

    let outcome = if state.is_complete() {
        MissionOutcome::Completed
    } else {
        MissionOutcome::Aborted
    };

    io.dispatcher.execute(DriveCommand::SpeedStop);
    io.dispatcher.execute(DriveCommand::DriveStop);

    let message = match outcome {
        MissionOutcome::Completed => "Mission complete",
        MissionOutcome::Aborted => "Mission aborted",
    };
    io.notifier.notify(NotificationKind::Console, None, message);
    io.notifier
        .notify(NotificationKind::ControlMode, None, "Parked");

    log::info!("Mission {} {}", id, outcome);
    outcome_tx.send_replace(Some(outcome));
}

impl LifecycleNode for MissionController {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn on_configure(&mut self) -> Result<()> {
        log::info!(
            "Configuring mission controller: tolerance {} m / {} deg",
            self.config.waypoint_tolerance_meters,
            self.config.heading_tolerance_degrees
        );
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<()> {
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<()> {
        self.cancel_mission();
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<()> {
        self.cancel_mission();
        self.base.set_state(State::Unconfigured);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NotificationSink;
    use crate::control::CommandDispatcher;
    use crate::perception::Localizer;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        commands: Mutex<Vec<DriveCommand>>,
        messages: Mutex<Vec<String>>,
    }

    impl CommandDispatcher for Recorder {
        fn execute(&self, command: DriveCommand) {
            self.commands.lock().unwrap().push(command);
        }
    }

    impl NotificationSink for Recorder {
        fn notify(&self, _kind: NotificationKind, _name: Option<&str>, data: &str) {
            self.messages.lock().unwrap().push(data.to_string());
        }
    }

    fn fast_config() -> NavigationConfig {
        NavigationConfig {
            decision_period_ms: 10,
            advance_period_ms: 10,
            drive_period_ms: 10,
            completion_grace_ms: 10,
            ..NavigationConfig::default()
        }
    }

    fn controller() -> (MissionController, Arc<Localizer>, Arc<Recorder>) {
        let localizer = Arc::new(Localizer::new());
        let recorder = Arc::new(Recorder::default());
        let io = NavigationIo {
            position: localizer.clone(),
            heading: localizer.clone(),
            dispatcher: recorder.clone(),
            notifier: recorder.clone(),
        };
        let mut mission = MissionController::new(fast_config(), io, DriveOverride::new());
        mission.on_configure().unwrap();
        mission.on_activate().unwrap();
        (mission, localizer, recorder)
    }

    #[tokio::test]
    async fn test_empty_waypoint_list_rejected() {
        let (mission, _localizer, recorder) = controller();
        assert_eq!(
            mission.start_mission(Vec::new()).await,
            Err(MissionError::EmptyWaypointList)
        );
        assert!(!mission.is_active());
        assert!(recorder.commands.lock().unwrap().is_empty());
        assert_eq!(mission.wait().await, None);
    }

    #[tokio::test]
    async fn test_start_requires_active_controller() {
        let (mut mission, _localizer, recorder) = controller();
        let far = GeoCoordinate::new(1.0, 1.0);

        mission.on_deactivate().unwrap();
        assert_eq!(
            mission.start_mission(vec![far]).await,
            Err(MissionError::NotActive)
        );
        mission.on_cleanup().unwrap();
        assert_eq!(
            mission.start_mission(vec![far]).await,
            Err(MissionError::NotActive)
        );
        assert!(!mission.is_active());
        assert!(recorder.commands.lock().unwrap().is_empty());
        assert!(recorder.messages.lock().unwrap().is_empty());

        mission.on_configure().unwrap();
        mission.on_activate().unwrap();
        assert!(mission.start_mission(vec![far]).await.is_ok());
        mission.cancel_mission();
        mission.wait().await;
    }

    #[tokio::test]
    async fn test_second_start_rejected_while_running() {
        let (mission, _localizer, _recorder) = controller();
        let far = GeoCoordinate::new(1.0, 1.0);
        mission.start_mission(vec![far]).await.unwrap();
        assert_eq!(
            mission.start_mission(vec![far]).await,
            Err(MissionError::MissionAlreadyActive)
        );
        assert_eq!(mission.current_target(), Some(far));

        mission.cancel_mission();
        assert_eq!(mission.wait().await, Some(MissionOutcome::Aborted));
        assert!(mission.start_mission(vec![far]).await.is_ok());
        mission.cancel_mission();
        mission.wait().await;
    }

    #[tokio::test]
    async fn test_mission_completes_at_waypoint() {
        let (mission, localizer, recorder) = controller();
        let p = GeoCoordinate::new(10.0, 10.0);
        localizer.update_position(p);
        localizer.update_heading(0.0);

        mission.start_mission(vec![p]).await.unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(5), mission.wait())
            .await
            .unwrap();
        assert_eq!(outcome, Some(MissionOutcome::Completed));
        assert!(!mission.is_active());

        let status = mission.status();
        assert_eq!(status.next_index, 1);
        assert_eq!(status.target, None);

        let commands = recorder.commands.lock().unwrap();
        assert_eq!(commands.first(), Some(&DriveCommand::SpeedNormal));
        assert_eq!(
            &commands[commands.len() - 2..],
            &[DriveCommand::SpeedStop, DriveCommand::DriveStop]
        );
        let messages = recorder.messages.lock().unwrap();
        assert_eq!(messages.iter().filter(|m| *m == "Mission complete").count(), 1);
        assert_eq!(messages.last().map(String::as_str), Some("Parked"));
    }

    #[tokio::test]
    async fn test_status_reports_distance() {
        let (mission, localizer, _recorder) = controller();
        assert_eq!(mission.status(), MissionStatus::idle());

        localizer.update_position(GeoCoordinate::new(0.0, 0.0));
        mission
            .start_mission(vec![GeoCoordinate::new(0.0, 1.0)])
            .await
            .unwrap();

        let status = mission.status();
        assert!(status.active);
        assert_eq!(status.next_index, 0);
        assert_eq!(status.waypoint_count, 1);
        let distance = mission.distance_to_target().unwrap();
        assert!((distance - 111_195.0).abs() < 50.0);

        mission.cancel_mission();
        mission.wait().await;
        assert_eq!(mission.distance_to_target(), None);
    }

    #[tokio::test]
    async fn test_deactivate_cancels_mission() {
        let (mut mission, _localizer, recorder) = controller();
        mission
            .start_mission(vec![GeoCoordinate::new(5.0, 5.0)])
            .await
            .unwrap();

        mission.on_deactivate().unwrap();
        assert_eq!(mission.wait().await, Some(MissionOutcome::Aborted));

        let commands = recorder.commands.lock().unwrap();
        let stops = commands
            .iter()
            .filter(|c| **c == DriveCommand::SpeedStop || **c == DriveCommand::DriveStop)
            .count();
        assert_eq!(stops, 2);
    }
}
