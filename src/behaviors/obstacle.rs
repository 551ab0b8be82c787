//! Obstacle avoidance
//!
//! Samples the forward range finder while autonomous mode is on and backs
//! the rover away from anything closer than the safe distance. Commands go
//! straight to the dispatcher; while an obstacle is present the shared
//! [`DriveOverride`] is raised so the mission drive loop does not undo them.

use crate::common::{NotificationKind, NotificationSink};
use crate::config::ObstacleConfig;
use crate::control::{CommandDispatcher, DriveCommand, DriveOverride};
use crate::error::{Result, RoverError, SensorError};
use crate::lifecycle::{CancellationToken, LifecycleNode, LifecycleNodeBase, State};
use crate::perception::DistanceSensor;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Response to one distance reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleReaction {
    /// New obstacle: back up while turning
    TurnAway,
    /// Obstacle still there: keep backing up
    KeepReversing,
    /// Obstacle just cleared: drive on
    Resume,
}

impl ObstacleReaction {
    pub fn command(&self) -> DriveCommand {
        match self {
            ObstacleReaction::TurnAway => DriveCommand::DriveReverseLeft,
            ObstacleReaction::KeepReversing => DriveCommand::DriveReverse,
            ObstacleReaction::Resume => DriveCommand::DriveForward,
        }
    }
}

/// Edge-triggered obstacle detector
#[derive(Debug, Clone)]
pub struct ObstacleState {
    was_obstacle_detected: bool,
    safe_distance_cm: f64,
}

impl ObstacleState {
    pub fn new(safe_distance_cm: f64) -> Self {
        ObstacleState {
            was_obstacle_detected: false,
            safe_distance_cm,
        }
    }

    /// Feed one reading. Clear-to-clear yields nothing.
    pub fn evaluate(&mut self, distance_cm: f64) -> Option<ObstacleReaction> {
        if distance_cm < self.safe_distance_cm {
            let reaction = if self.was_obstacle_detected {
                ObstacleReaction::KeepReversing
            } else {
                ObstacleReaction::TurnAway
            };
            self.was_obstacle_detected = true;
            Some(reaction)
        } else if self.was_obstacle_detected {
            self.was_obstacle_detected = false;
            Some(ObstacleReaction::Resume)
        } else {
            None
        }
    }

    pub fn was_obstacle_detected(&self) -> bool {
        self.was_obstacle_detected
    }

    pub fn reset(&mut self) {
        self.was_obstacle_detected = false;
    }
}

/// Value of the autonomous switch. `epoch` counts enable transitions so the
/// loop notices an off/on flip even if it never saw the "off".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct AvoidanceMode {
    enabled: bool,
    epoch: u64,
}

/// Obstacle avoidance component with its own on/off switch, independent of
/// any mission
pub struct ObstacleAvoidance {
    base: LifecycleNodeBase,
    config: ObstacleConfig,
    sensor: Arc<dyn DistanceSensor>,
    dispatcher: Arc<dyn CommandDispatcher>,
    notifier: Arc<dyn NotificationSink>,
    drive_override: DriveOverride,
    mode: watch::Sender<AvoidanceMode>,
    toggle: Arc<Mutex<()>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ObstacleAvoidance {
    pub fn new(
        config: ObstacleConfig,
        sensor: Arc<dyn DistanceSensor>,
        dispatcher: Arc<dyn CommandDispatcher>,
        notifier: Arc<dyn NotificationSink>,
        drive_override: DriveOverride,
    ) -> Self {
        ObstacleAvoidance {
            base: LifecycleNodeBase::new("obstacle_avoidance"),
            config,
            sensor,
            dispatcher,
            notifier,
            drive_override,
            mode: watch::Sender::new(AvoidanceMode::default()),
            toggle: Arc::new(Mutex::new(())),
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    /// Switch autonomous driving on or off.
    ///
    /// Switching on starts the rover forward; switching off stops it. Calls
    /// that do not change the switch do nothing, and switching on is ignored
    /// unless the component is active.
    pub fn set_enabled(&self, enabled: bool) {
        let _toggle = self.toggle.lock().unwrap_or_else(PoisonError::into_inner);
        let mut mode = *self.mode.borrow();
        if mode.enabled == enabled {
            return;
        }

        if enabled {
            if self.base.get_state() != State::Active {
                log::warn!("{} is not active, ignoring enable", self.base.name);
                return;
            }
            log::info!("Autonomous avoidance enabled");
            self.drive_override.set(false);
            self.dispatcher.execute(DriveCommand::SpeedNormal);
            self.dispatcher.execute(DriveCommand::DriveForward);
            self.notifier
                .notify(NotificationKind::ControlMode, None, "Autonomous");
            mode.enabled = true;
            mode.epoch += 1;
            self.mode.send_replace(mode);
        } else {
            log::info!("Autonomous avoidance disabled");
            mode.enabled = false;
            self.mode.send_replace(mode);
            self.drive_override.set(false);
            self.dispatcher.execute(DriveCommand::DriveStop);
            self.dispatcher.execute(DriveCommand::SpeedStop);
            self.notifier
                .notify(NotificationKind::ControlMode, None, "Parked");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode.borrow().enabled
    }

    /// Whether avoidance currently holds the wheels
    pub fn is_obstacle_detected(&self) -> bool {
        self.drive_override.is_active()
    }

    /// Whether the sampling task is alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl LifecycleNode for ObstacleAvoidance {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn on_configure(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            RoverError::Lifecycle(format!("{} needs a tokio runtime: {}", self.base.name, e))
        })?;

        log::info!(
            "Configuring obstacle avoidance: safe distance {} cm, period {:?}",
            self.config.safe_distance_cm,
            self.config.period()
        );
        self.shutdown = CancellationToken::new();
        let sampler = AvoidanceLoop {
            config: self.config.clone(),
            sensor: Arc::clone(&self.sensor),
            dispatcher: Arc::clone(&self.dispatcher),
            notifier: Arc::clone(&self.notifier),
            drive_override: self.drive_override.clone(),
            mode: self.mode.subscribe(),
            toggle: Arc::clone(&self.toggle),
            shutdown: self.shutdown.clone(),
            state: ObstacleState::new(self.config.safe_distance_cm),
        };
        self.task = Some(runtime.spawn(sampler.run()));
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<()> {
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<()> {
        self.set_enabled(false);
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<()> {
        self.set_enabled(false);
        self.shutdown.cancel();
        self.task = None;
        self.base.set_state(State::Unconfigured);
        Ok(())
    }
}

impl Drop for ObstacleAvoidance {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct AvoidanceLoop {
    config: ObstacleConfig,
    sensor: Arc<dyn DistanceSensor>,
    dispatcher: Arc<dyn CommandDispatcher>,
    notifier: Arc<dyn NotificationSink>,
    drive_override: DriveOverride,
    mode: watch::Receiver<AvoidanceMode>,
    toggle: Arc<Mutex<()>>,
    shutdown: CancellationToken,
    state: ObstacleState,
}

impl AvoidanceLoop {
    async fn run(mut self) {
        log::info!("Obstacle avoidance loop started ({:?} period)", self.config.period());
        let mut epoch = 0;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let mode = *self.mode.borrow_and_update();
            if mode.epoch != epoch {
                self.state.reset();
                epoch = mode.epoch;
            }
            if !mode.enabled {
                self.state.reset();
                self.drive_override.set(false);
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    changed = self.mode.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                continue;
            }

            let timeout = self.config.read_timeout();
            let reading = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                reading = tokio::time::timeout(timeout, self.sensor.measure_cm(timeout)) => {
                    reading.unwrap_or(Err(SensorError::Timeout(timeout)))
                }
            };

            {
                // the switch cannot move while a reaction goes out
                let toggle = Arc::clone(&self.toggle);
                let _toggle = toggle.lock().unwrap_or_else(PoisonError::into_inner);
                if *self.mode.borrow() != mode {
                    // switched off or flipped while reading
                    continue;
                }
                self.handle(reading);
            }

            if !self.shutdown.sleep(self.config.period()).await {
                break;
            }
        }
        log::info!("Obstacle avoidance loop stopped");
    }

    fn handle(&mut self, reading: std::result::Result<f64, SensorError>) -> Option<ObstacleReaction> {
        let distance = match reading.and_then(check_reading) {
            Ok(distance) => distance,
            Err(e) => {
                log::warn!("Distance read failed: {}", e);
                self.console(&format!("Autonomous mode error... {}", e));
                return None;
            }
        };

        let reaction = self.state.evaluate(distance)?;
        match reaction {
            ObstacleReaction::TurnAway => {
                log::info!("Obstacle at {:.0} cm, turning away", distance);
                self.console(&format!("OBSTACLE in {:.0} cm", distance));
                self.console("Reversing...");
                self.drive_override.set(true);
                self.dispatcher.execute(DriveCommand::SpeedNormal);
                self.dispatcher.execute(reaction.command());
            }
            ObstacleReaction::KeepReversing => {
                self.console(&format!("OBSTACLE in {:.0} cm", distance));
                self.drive_override.set(true);
                self.dispatcher.execute(DriveCommand::SpeedNormal);
                self.dispatcher.execute(reaction.command());
            }
            ObstacleReaction::Resume => {
                log::info!("Clear at {:.0} cm, resuming", distance);
                self.console("Rover at safe distance...");
                self.dispatcher.execute(DriveCommand::SpeedNormal);
                self.dispatcher.execute(reaction.command());
                self.drive_override.set(false);
            }
        }
        Some(reaction)
    }

    fn console(&self, text: &str) {
        self.notifier.notify(NotificationKind::Console, None, text);
    }
}

fn check_reading(distance_cm: f64) -> std::result::Result<f64, SensorError> {
    if distance_cm.is_finite() && distance_cm >= 0.0 {
        Ok(distance_cm)
    } else {
        Err(SensorError::Unavailable(format!("invalid reading {}", distance_cm)))
    }
}
