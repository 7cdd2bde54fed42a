//! Geographic primitives: coordinate validation and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mean Earth radius in kilometres (spherical WGS-84 approximation).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Construct a point, rejecting out-of-range coordinates.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoreError::Validation(format!(
                "latitude {lat} out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::Validation(format!(
                "longitude {lng} out of range [-180, 180]"
            )));
        }
        Ok(Self { lat, lng })
    }
}

/// Great-circle distance between two points via the haversine formula.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
