//! Great-circle helpers for waypoint navigation
//!
//! All functions are pure. NaN inputs propagate to NaN outputs.

use crate::common::GeoCoordinate;
use std::f64::consts::PI;

const EARTH_RADIUS_MILES: f64 = 3959.0;
const EARTH_RADIUS_KILOMETERS: f64 = 6371.0;
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Unit for [`distance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
    Meters,
}

impl DistanceUnit {
    fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KILOMETERS,
            DistanceUnit::Meters => EARTH_RADIUS_METERS,
        }
    }
}

/// Convert radians to a compass bearing in `[0, 360)`
pub fn to_bearing(radians: f64) -> f64 {
    (radians.to_degrees() + 360.0) % 360.0
}

/// Wrap a longitude difference in radians into `(-PI, PI]`
pub fn normalize_delta_longitude(d_lon: f64) -> f64 {
    if d_lon.abs() > PI {
        if d_lon > 0.0 {
            -(2.0 * PI - d_lon)
        } else {
            2.0 * PI + d_lon
        }
    } else {
        d_lon
    }
}

/// Rhumb-line (Mercator) bearing from `from` to `to` in degrees, `[0, 360)`.
///
/// Coincident points yield 0.
pub fn bearing_degrees(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    let d_lon = normalize_delta_longitude((to.longitude - from.longitude).to_radians());
    let d_phi = ((to.latitude.to_radians() / 2.0 + PI / 4.0).tan()
        / (from.latitude.to_radians() / 2.0 + PI / 4.0).tan())
    .ln();

    to_bearing(d_lon.atan2(d_phi))
}

/// Haversine distance between two coordinates, rounded to 2 decimals
pub fn distance(from: &GeoCoordinate, to: &GeoCoordinate, unit: DistanceUnit) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let d_lat = lat_to - lat_from;
    let d_lon = to.longitude.to_radians() - from.longitude.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat_from.cos() * lat_to.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round2(c * unit.earth_radius())
}

/// Haversine distance in meters, rounded to 2 decimals
pub fn distance_meters(from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
    distance(from, to, DistanceUnit::Meters)
}

/// Great-circle destination reached from `from` after `distance_m` meters
/// on initial bearing `bearing` (degrees)
pub fn destination(from: &GeoCoordinate, bearing: f64, distance_m: f64) -> GeoCoordinate {
    let lat1 = from.latitude.to_radians();
    let lon1 = from.longitude.to_radians();
    let brng = bearing.to_radians();
    let angular = distance_m / EARTH_RADIUS_METERS;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * brng.cos()).asin();
    let lon2 = lon1
        + (brng.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    // back into [-180, 180)
    let lon2 = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
    GeoCoordinate::new(lat2.to_degrees(), lon2)
}

/// Normalize an angular difference in degrees into `[-180, 180]`.
///
/// Inputs are differences of two bearings in `[0, 360)`, so one correction
/// is always enough.
pub fn normalize_heading_error(error: f64) -> f64 {
    if error > 180.0 {
        error - 360.0
    } else if error < -180.0 {
        error + 360.0
    } else {
        error
    }
}

/// Two decimals, halves to even
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
