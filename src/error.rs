//! Error types for the rover core

use std::time::Duration;
use thiserror::Error;

/// Reasons `start_mission` can be rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionError {
    #[error("waypoint list is empty")]
    EmptyWaypointList,

    #[error("mission controller is not active")]
    NotActive,

    #[error("a mission is already active")]
    MissionAlreadyActive,
}

/// Failures of a single sensor read.
///
/// These never leave a control loop: the tick is skipped and the previous
/// decision stays in effect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("sensor read timed out after {0:?}")]
    Timeout(Duration),

    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

/// Rover core error type
#[derive(Error, Debug)]
pub enum RoverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error(transparent)]
    Mission(#[from] MissionError),
}

impl From<toml::de::Error> for RoverError {
    fn from(e: toml::de::Error) -> Self {
        RoverError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RoverError>;
