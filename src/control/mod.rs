//! Control module for the rover
//!
//! Symbolic drive commands and the narrow dispatch interface that the
//! navigation and obstacle loops talk to.
pub mod controllers;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub use self::controllers::HeadingController;

/// Symbolic actuation command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveCommand {
    DriveForward,
    DriveReverse,
    DriveLeft,
    DriveRight,
    DriveStop,
    DriveReverseLeft,
    DriveReverseRight,
    SpeedNormal,
    SpeedSlow,
    SpeedStop,
}

impl DriveCommand {
    /// Symbolic name as used on the command channel
    pub fn name(&self) -> &'static str {
        match self {
            DriveCommand::DriveForward => "DRIVE-2",
            DriveCommand::DriveReverse => "DRIVE-3",
            DriveCommand::DriveLeft => "DRIVE-4",
            DriveCommand::DriveRight => "DRIVE-5",
            DriveCommand::DriveStop => "DRIVE-1",
            DriveCommand::DriveReverseLeft => "DRIVE-10",
            DriveCommand::DriveReverseRight => "DRIVE-11",
            DriveCommand::SpeedNormal => "SPEEDNORMAL",
            DriveCommand::SpeedSlow => "SPEEDSLOW",
            DriveCommand::SpeedStop => "SPEEDSTOP",
        }
    }

    /// Value written to the motor controller's serial link.
    ///
    /// Left and right are crossed on the controller board.
    pub fn wire_value(&self) -> &'static str {
        match self {
            DriveCommand::DriveForward => "2",
            DriveCommand::DriveReverse => "3",
            DriveCommand::DriveLeft => "5",
            DriveCommand::DriveRight => "4",
            DriveCommand::DriveStop => "1",
            DriveCommand::DriveReverseLeft => "10",
            DriveCommand::DriveReverseRight => "11",
            DriveCommand::SpeedNormal => "160",
            DriveCommand::SpeedSlow => "100",
            DriveCommand::SpeedStop => "0",
        }
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Narrow actuation interface.
///
/// `execute` is fire-and-forget and must keep the order of calls.
pub trait CommandDispatcher: Send + Sync {
    fn execute(&self, command: DriveCommand);
}

/// FIFO command queue in front of a single actuator writer.
///
/// All loops share the sending side; the actuation layer drains the
/// receiver in order, so a safety command issued after a mission command
/// is also applied after it.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<DriveCommand>,
}

impl CommandQueue {
    /// Create a queue and the receiver the actuation layer drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DriveCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CommandQueue { tx }, rx)
    }
}

impl CommandDispatcher for CommandQueue {
    fn execute(&self, command: DriveCommand) {
        log::debug!("Dispatching {} ({})", command, command.wire_value());
        if self.tx.send(command).is_err() {
            log::warn!("Actuator queue closed, dropping {}", command);
        }
    }
}

/// Flag raised by obstacle avoidance while it owns the wheels.
///
/// The drive loop checks it before re-asserting its own command.
#[derive(Debug, Clone, Default)]
pub struct DriveOverride {
    active: Arc<AtomicBool>,
}

impl DriveOverride {
    /// Create a lowered flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise or lower the override
    pub fn set(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Whether the override is currently raised
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
