//! Sensor interfaces consumed by the navigation core
//!
//! The concrete drivers (NMEA parsing, magnetometer registers, ultrasonic
//! timing) live outside this crate and hand over already decoded values.

use crate::common::GeoCoordinate;
use crate::error::SensorError;
use async_trait::async_trait;
use std::time::Duration;

/// Latest known position fix
pub trait PositionSource: Send + Sync {
    /// Non-blocking; `None` until the first fix arrives
    fn current_position(&self) -> Option<GeoCoordinate>;
}

/// Latest known compass heading
pub trait HeadingSource: Send + Sync {
    /// Heading in degrees `[0, 360)`, declination already applied.
    /// Non-blocking; `None` until the first sample arrives.
    fn current_heading_degrees(&self) -> Option<f64>;
}

/// Forward-looking range finder
#[async_trait]
pub trait DistanceSensor: Send + Sync {
    /// Measure the distance to the nearest obstacle ahead in centimeters.
    ///
    /// Must give up after `timeout` with [`SensorError::Timeout`].
    async fn measure_cm(&self, timeout: Duration) -> Result<f64, SensorError>;
}
