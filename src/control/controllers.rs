//! Controllers for the rover

use crate::common::DriveDirection;
use crate::navigation::geo::normalize_heading_error;

/// Bang-bang steering controller for a skid-steer rover.
///
/// Turns toward the target bearing until the heading error is inside the
/// tolerance, then drives straight.
#[derive(Debug, Clone, Copy)]
pub struct HeadingController {
    heading_tolerance_degrees: f64,
}

impl HeadingController {
    /// Create a new controller
    pub fn new(heading_tolerance_degrees: f64) -> Self {
        HeadingController {
            heading_tolerance_degrees,
        }
    }

    /// Signed heading error in `[-180, 180]`; positive means the target is
    /// clockwise of the current heading
    pub fn heading_error(&self, target_bearing: f64, compass_heading: f64) -> f64 {
        normalize_heading_error(target_bearing - compass_heading)
    }

    /// Compute the drive direction
    pub fn compute_direction(&self, target_bearing: f64, compass_heading: f64) -> DriveDirection {
        let error = self.heading_error(target_bearing, compass_heading);

        if error.abs() <= self.heading_tolerance_degrees {
            DriveDirection::Forward
        } else if error < 0.0 {
            DriveDirection::Left
        } else {
            DriveDirection::Right
        }
    }
}
