//! Behaviors module for the rover
//!
//! Reactive behaviors that run beside, and take precedence over, mission
//! navigation.
pub mod obstacle;

pub use self::obstacle::{ObstacleAvoidance, ObstacleReaction, ObstacleState};
