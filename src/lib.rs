pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod navigation;
pub mod perception;

use crate::behaviors::ObstacleAvoidance;
use crate::common::{GeoCoordinate, NotificationSink};
use crate::config::RoverConfig;
use crate::control::{CommandDispatcher, DriveOverride};
use crate::error::{MissionError, Result};
use crate::lifecycle::LifecycleNode;
use crate::navigation::{MissionController, MissionOutcome, MissionStatus, NavigationIo};
use crate::perception::{DistanceSensor, HeadingSource, PositionSource};
use std::sync::Arc;

/// Sensors and outputs the core is wired to
#[derive(Clone)]
pub struct RoverIo {
    pub position: Arc<dyn PositionSource>,
    pub heading: Arc<dyn HeadingSource>,
    pub distance: Arc<dyn DistanceSensor>,
    pub dispatcher: Arc<dyn CommandDispatcher>,
    pub notifier: Arc<dyn NotificationSink>,
}

/// Core functionality for the rover: waypoint missions plus obstacle
/// avoidance, sharing one actuator path
pub struct RoverCore {
    config: RoverConfig,
    mission: MissionController,
    avoidance: ObstacleAvoidance,
}

impl RoverCore {
    /// Create a new instance of RoverCore
    pub fn new(config: RoverConfig, io: RoverIo) -> Result<Self> {
        config.validate()?;

        let drive_override = DriveOverride::new();
        let navigation_io = NavigationIo {
            position: io.position,
            heading: io.heading,
            dispatcher: Arc::clone(&io.dispatcher),
            notifier: Arc::clone(&io.notifier),
        };
        let mission = MissionController::new(
            config.navigation.clone(),
            navigation_io,
            drive_override.clone(),
        );
        let avoidance = ObstacleAvoidance::new(
            config.obstacle.clone(),
            io.distance,
            io.dispatcher,
            io.notifier,
            drive_override,
        );

        Ok(RoverCore {
            config,
            mission,
            avoidance,
        })
    }

    pub fn config(&self) -> &RoverConfig {
        &self.config
    }

    fn components_mut(&mut self) -> [&mut dyn LifecycleNode; 2] {
        [&mut self.avoidance, &mut self.mission]
    }

    /// Initialize all components. Must be called inside a tokio runtime.
    pub fn init(&mut self) -> Result<()> {
        for component in self.components_mut() {
            log::info!("Initializing {}", component.name());
            component.on_configure()?;
            component.on_activate()?;
        }
        Ok(())
    }

    /// Shutdown all components
    pub fn shutdown(&mut self) -> Result<()> {
        for component in self.components_mut() {
            log::info!("Shutting down {}", component.name());
            component.on_deactivate()?;
            component.on_cleanup()?;
        }
        Ok(())
    }

    pub async fn start_mission(
        &self,
        waypoints: Vec<GeoCoordinate>,
    ) -> std::result::Result<(), MissionError> {
        self.mission.start_mission(waypoints).await
    }

    pub fn cancel_mission(&self) {
        self.mission.cancel_mission();
    }

    /// Wait until the current mission ends
    pub async fn wait_for_mission(&self) -> Option<MissionOutcome> {
        self.mission.wait().await
    }

    pub fn set_autonomous_avoidance_enabled(&self, enabled: bool) {
        self.avoidance.set_enabled(enabled);
    }

    pub fn is_autonomous_avoidance_enabled(&self) -> bool {
        self.avoidance.is_enabled()
    }

    pub fn is_obstacle_detected(&self) -> bool {
        self.avoidance.is_obstacle_detected()
    }

    pub fn is_avoidance_running(&self) -> bool {
        self.avoidance.is_running()
    }

    pub fn is_mission_active(&self) -> bool {
        self.mission.is_active()
    }

    pub fn current_target(&self) -> Option<GeoCoordinate> {
        self.mission.current_target()
    }

    pub fn distance_to_target(&self) -> Option<f64> {
        self.mission.distance_to_target()
    }

    pub fn mission_status(&self) -> MissionStatus {
        self.mission.status()
    }
}
