//! Localization module
//!
//! Holds the most recent position fix and compass heading in one-slot
//! "latest value" channels. GPS and compass adapters push into it; the
//! navigation loops pull point-in-time snapshots.

use super::sensors::{HeadingSource, PositionSource};
use crate::common::GeoCoordinate;
use tokio::sync::watch;

/// Latest-value store for position and heading
#[derive(Debug)]
pub struct Localizer {
    position: watch::Sender<Option<GeoCoordinate>>,
    heading: watch::Sender<Option<f64>>,
}

impl Localizer {
    /// Create a localizer with no fix and no heading
    pub fn new() -> Self {
        Localizer {
            position: watch::Sender::new(None),
            heading: watch::Sender::new(None),
        }
    }

    /// Publish a new position fix
    pub fn update_position(&self, position: GeoCoordinate) {
        self.position.send_replace(Some(position));
    }

    /// Publish a new compass heading in degrees; wrapped into `[0, 360)`
    pub fn update_heading(&self, heading: f64) {
        self.heading.send_replace(Some(heading.rem_euclid(360.0)));
    }

    /// Forget the current fix, e.g. when the receiver reports loss of lock
    pub fn clear_position(&self) {
        self.position.send_replace(None);
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for Localizer {
    fn current_position(&self) -> Option<GeoCoordinate> {
        *self.position.borrow()
    }
}

impl HeadingSource for Localizer {
    fn current_heading_degrees(&self) -> Option<f64> {
        *self.heading.borrow()
    }
}
