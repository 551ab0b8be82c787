//! Drives a simulated rover through the configured waypoint mission.
//!
//! Usage: `mission_demo [config.toml]` (default `config/navigation_params.toml`).
//! Set `RUST_LOG=debug` to see every decision and dispatched command.

use anyhow::{bail, Context};
use async_trait::async_trait;
use rover_core::common::{GeoCoordinate, LogSink};
use rover_core::config::RoverConfig;
use rover_core::control::{CommandQueue, DriveCommand};
use rover_core::error::SensorError;
use rover_core::navigation::geo::destination;
use rover_core::perception::{DistanceSensor, Localizer};
use rover_core::{RoverCore, RoverIo};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

const DEFAULT_CONFIG: &str = "config/navigation_params.toml";
const START: GeoCoordinate = GeoCoordinate {
    latitude: 47.6422,
    longitude: -122.1368,
};
const STEP: Duration = Duration::from_millis(100);
const TURN_RATE_DEG_PER_SEC: f64 = 30.0;
const MISSION_TIMEOUT: Duration = Duration::from_secs(180);

/// Motion state of the simulated chassis
struct SimRover {
    position: GeoCoordinate,
    heading: f64,
    speed_mps: f64,
    command: DriveCommand,
}

impl SimRover {
    fn apply(&mut self, command: DriveCommand) {
        match command {
            DriveCommand::SpeedNormal => self.speed_mps = 2.0,
            DriveCommand::SpeedSlow => self.speed_mps = 1.0,
            DriveCommand::SpeedStop => self.speed_mps = 0.0,
            drive => self.command = drive,
        }
    }

    /// Advance the simulation by `dt`
    fn step(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        let turn = TURN_RATE_DEG_PER_SEC * dt;
        // (heading change, fraction of speed along heading)
        let (d_heading, along) = match self.command {
            DriveCommand::DriveForward => (0.0, 1.0),
            DriveCommand::DriveReverse => (0.0, -1.0),
            DriveCommand::DriveLeft => (-turn, 0.5),
            DriveCommand::DriveRight => (turn, 0.5),
            DriveCommand::DriveReverseLeft => (turn, -0.5),
            DriveCommand::DriveReverseRight => (-turn, -0.5),
            _ => (0.0, 0.0),
        };
        self.heading = (self.heading + d_heading).rem_euclid(360.0);

        let travelled = self.speed_mps * along * dt;
        if travelled != 0.0 {
            let bearing = if travelled > 0.0 {
                self.heading
            } else {
                (self.heading + 180.0) % 360.0
            };
            self.position = destination(&self.position, bearing, travelled.abs());
        }
    }
}

/// Range finder that reports a phantom obstacle during a fixed window
struct SimRangeFinder {
    started: Instant,
    obstacle_from: Duration,
    obstacle_until: Duration,
}

#[async_trait]
impl DistanceSensor for SimRangeFinder {
    async fn measure_cm(&self, _timeout: Duration) -> Result<f64, SensorError> {
        // echo time of a real ultrasonic ping
        tokio::time::sleep(Duration::from_millis(5)).await;
        let elapsed = self.started.elapsed();
        if elapsed >= self.obstacle_from && elapsed < self.obstacle_until {
            Ok(30.0)
        } else {
            Ok(250.0)
        }
    }
}

async fn simulate(
    mut rover: SimRover,
    localizer: Arc<Localizer>,
    mut commands: mpsc::UnboundedReceiver<DriveCommand>,
) {
    let mut ticker = tokio::time::interval(STEP);
    loop {
        ticker.tick().await;
        loop {
            match commands.try_recv() {
                Ok(command) => rover.apply(command),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return,
            }
        }
        rover.step(STEP);
        localizer.update_position(rover.position);
        localizer.update_heading(rover.heading);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = if Path::new(&path).exists() {
        RoverConfig::from_file(&path).with_context(|| format!("loading {}", path))?
    } else {
        log::warn!("{} not found, using defaults", path);
        RoverConfig::default()
    };
    let waypoints = config.mission.waypoints.clone();
    if waypoints.is_empty() {
        bail!("no waypoints configured in [mission]");
    }

    let localizer = Arc::new(Localizer::new());
    let (queue, commands) = CommandQueue::new();
    let rover = SimRover {
        position: START,
        heading: 0.0,
        speed_mps: 0.0,
        command: DriveCommand::DriveStop,
    };
    localizer.update_position(rover.position);
    localizer.update_heading(rover.heading);
    tokio::spawn(simulate(rover, Arc::clone(&localizer), commands));

    let io = RoverIo {
        position: localizer.clone(),
        heading: localizer.clone(),
        distance: Arc::new(SimRangeFinder {
            started: Instant::now(),
            obstacle_from: Duration::from_secs(4),
            obstacle_until: Duration::from_secs(5),
        }),
        dispatcher: Arc::new(queue),
        notifier: Arc::new(LogSink),
    };

    let mut core = RoverCore::new(config, io)?;
    core.init()?;
    core.set_autonomous_avoidance_enabled(true);

    log::info!("Starting mission from {} over {} waypoints", START, waypoints.len());
    core.start_mission(waypoints)
        .await
        .context("starting mission")?;

    let mut status_ticker = tokio::time::interval(Duration::from_secs(2));
    let deadline = tokio::time::sleep(MISSION_TIMEOUT);
    tokio::pin!(deadline);
    let mut timed_out = false;

    let outcome = loop {
        tokio::select! {
            outcome = core.wait_for_mission() => break outcome,
            _ = status_ticker.tick() => {
                let status = core.mission_status();
                log::info!(
                    "waypoint {}/{} distance {:?} m direction {}",
                    status.next_index,
                    status.waypoint_count,
                    status.distance_to_target_meters,
                    status.direction
                );
            }
            _ = &mut deadline, if !timed_out => {
                timed_out = true;
                log::warn!("Mission timed out after {:?}", MISSION_TIMEOUT);
                core.cancel_mission();
            }
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupted");
                core.cancel_mission();
            }
        }
    };

    log::info!("Mission finished: {:?}", outcome);
    core.set_autonomous_avoidance_enabled(false);
    core.shutdown()?;
    Ok(())
}
