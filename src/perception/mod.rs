//! Perception module for the rover: sensor interfaces and the latest-fix store
pub mod localization;
pub mod sensors;

pub use self::localization::Localizer;
pub use self::sensors::{DistanceSensor, HeadingSource, PositionSource};
