//! Configuration loading for the rover core

use crate::common::GeoCoordinate;
use crate::error::{Result, RoverError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoverConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub obstacle: ObstacleConfig,
    #[serde(default)]
    pub mission: MissionConfig,
}

/// Waypoint navigation settings
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Distance at which a waypoint counts as reached (default: 5.0 m)
    #[serde(default = "default_waypoint_tolerance")]
    pub waypoint_tolerance_meters: f64,

    /// Bearing error still considered "pointed at target" (default: 5.0°)
    #[serde(default = "default_heading_tolerance")]
    pub heading_tolerance_degrees: f64,

    /// Direction decision tick (default: 2000 ms)
    #[serde(default = "default_mission_period")]
    pub decision_period_ms: u64,

    /// Waypoint advance tick (default: 2000 ms)
    #[serde(default = "default_mission_period")]
    pub advance_period_ms: u64,

    /// Drive command re-assertion tick (default: 2000 ms)
    #[serde(default = "default_mission_period")]
    pub drive_period_ms: u64,

    /// Delay between reaching the last waypoint and stopping (default: 1000 ms)
    #[serde(default = "default_completion_grace")]
    pub completion_grace_ms: u64,
}

/// Obstacle avoidance settings
#[derive(Clone, Debug, Deserialize)]
pub struct ObstacleConfig {
    /// Anything closer than this is an obstacle (default: 50 cm)
    #[serde(default = "default_safe_distance")]
    pub safe_distance_cm: f64,

    /// Sampling tick (default: 200 ms)
    #[serde(default = "default_obstacle_period")]
    pub period_ms: u64,

    /// Upper bound on one distance reading (default: 1000 ms)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Optional mission preset, used by the demo binary
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MissionConfig {
    /// Waypoints as `[lat, lon]` pairs, visited in order
    #[serde(default)]
    pub waypoints: Vec<GeoCoordinate>,
}

fn default_waypoint_tolerance() -> f64 {
    5.0
}
fn default_heading_tolerance() -> f64 {
    5.0
}
fn default_mission_period() -> u64 {
    2000
}
fn default_completion_grace() -> u64 {
    1000
}
fn default_safe_distance() -> f64 {
    50.0
}
fn default_obstacle_period() -> u64 {
    200
}
fn default_read_timeout() -> u64 {
    1000
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            waypoint_tolerance_meters: default_waypoint_tolerance(),
            heading_tolerance_degrees: default_heading_tolerance(),
            decision_period_ms: default_mission_period(),
            advance_period_ms: default_mission_period(),
            drive_period_ms: default_mission_period(),
            completion_grace_ms: default_completion_grace(),
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        ObstacleConfig {
            safe_distance_cm: default_safe_distance(),
            period_ms: default_obstacle_period(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl NavigationConfig {
    pub fn decision_period(&self) -> Duration {
        Duration::from_millis(self.decision_period_ms)
    }

    pub fn advance_period(&self) -> Duration {
        Duration::from_millis(self.advance_period_ms)
    }

    pub fn drive_period(&self) -> Duration {
        Duration::from_millis(self.drive_period_ms)
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }
}

impl ObstacleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl RoverConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RoverConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let nav = &self.navigation;
        let obstacle = &self.obstacle;

        if nav.waypoint_tolerance_meters.is_nan() || nav.waypoint_tolerance_meters < 0.0 {
            return Err(config_error("waypoint_tolerance_meters must be non-negative"));
        }
        if !(0.0..=180.0).contains(&nav.heading_tolerance_degrees) {
            return Err(config_error("heading_tolerance_degrees must be within [0, 180]"));
        }
        if nav.decision_period_ms == 0 || nav.advance_period_ms == 0 || nav.drive_period_ms == 0 {
            return Err(config_error("navigation periods must be positive"));
        }
        if obstacle.safe_distance_cm.is_nan() || obstacle.safe_distance_cm <= 0.0 {
            return Err(config_error("safe_distance_cm must be positive"));
        }
        if obstacle.period_ms == 0 {
            return Err(config_error("obstacle period_ms must be positive"));
        }
        if obstacle.read_timeout_ms == 0 {
            return Err(config_error("read_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Apply flat key/value overrides, e.g. from a parameter server.
    ///
    /// Unknown keys are ignored. The result is validated; on error the
    /// configuration is left unchanged.
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        let mut next = self.clone();

        if let Some(&v) = params.get("waypoint_tolerance_meters") {
            next.navigation.waypoint_tolerance_meters = v;
        }
        if let Some(&v) = params.get("heading_tolerance_degrees") {
            next.navigation.heading_tolerance_degrees = v;
        }
        if let Some(&v) = params.get("decision_period_ms") {
            next.navigation.decision_period_ms = millis(v, "decision_period_ms")?;
        }
        if let Some(&v) = params.get("advance_period_ms") {
            next.navigation.advance_period_ms = millis(v, "advance_period_ms")?;
        }
        if let Some(&v) = params.get("drive_period_ms") {
            next.navigation.drive_period_ms = millis(v, "drive_period_ms")?;
        }
        if let Some(&v) = params.get("completion_grace_ms") {
            next.navigation.completion_grace_ms = millis(v, "completion_grace_ms")?;
        }
        if let Some(&v) = params.get("safe_distance_cm") {
            next.obstacle.safe_distance_cm = v;
        }
        if let Some(&v) = params.get("obstacle_period_ms") {
            next.obstacle.period_ms = millis(v, "obstacle_period_ms")?;
        }
        if let Some(&v) = params.get("read_timeout_ms") {
            next.obstacle.read_timeout_ms = millis(v, "read_timeout_ms")?;
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn millis(value: f64, key: &str) -> Result<u64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value.round() as u64)
    } else {
        Err(config_error(&format!("{} must be a non-negative number", key)))
    }
}

fn config_error(msg: &str) -> RoverError {
    RoverError::Config(msg.to_string())
}
