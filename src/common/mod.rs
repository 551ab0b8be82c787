//! Common utilities and types for the rover core

pub mod notification;

pub use notification::{LogSink, NotificationKind, NotificationSink};
pub use types::{DriveDirection, GeoCoordinate};

/// Common types and utilities used across the codebase
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /// A geographic coordinate in degrees.
    ///
    /// Equality is exact field equality; two fixes that differ in the last
    /// bit of a float are different coordinates.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(from = "(f64, f64)", into = "(f64, f64)")]
    pub struct GeoCoordinate {
        pub latitude: f64,
        pub longitude: f64,
    }

    impl GeoCoordinate {
        /// Create a new coordinate
        pub fn new(latitude: f64, longitude: f64) -> Self {
            GeoCoordinate {
                latitude,
                longitude,
            }
        }
    }

    impl From<(f64, f64)> for GeoCoordinate {
        fn from((latitude, longitude): (f64, f64)) -> Self {
            GeoCoordinate::new(latitude, longitude)
        }
    }

    impl From<GeoCoordinate> for (f64, f64) {
        fn from(c: GeoCoordinate) -> Self {
            (c.latitude, c.longitude)
        }
    }

    impl fmt::Display for GeoCoordinate {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{},{}", self.latitude, self.longitude)
        }
    }

    /// Direction the rover is currently meant to be driving
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum DriveDirection {
        Forward,
        Reverse,
        Left,
        Right,
        #[default]
        Stop,
    }

    impl DriveDirection {
        /// Human readable name used in notifications
        pub fn name(&self) -> &'static str {
            match self {
                DriveDirection::Forward => "Forward",
                DriveDirection::Reverse => "Reverse",
                DriveDirection::Left => "Left",
                DriveDirection::Right => "Right",
                DriveDirection::Stop => "Stop",
            }
        }
    }

    impl fmt::Display for DriveDirection {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }
}
