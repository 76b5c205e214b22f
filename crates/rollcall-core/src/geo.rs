//! Great-circle distance and geofence checks.
//!
//! Distances use the haversine formula on a sphere of Earth's mean radius.
//! Everything here is pure; acquiring a device position lives in
//! [`crate::location`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Earth's mean radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "latitude": 51.5074, "longitude": -0.1278 }))]
pub struct Coordinate {
    /// Latitude in degrees, -90 to 90.
    #[schema(example = 51.5074, minimum = -90.0, maximum = 90.0)]
    pub latitude: f64,

    /// Longitude in degrees, -180 to 180.
    #[schema(example = -0.1278, minimum = -180.0, maximum = 180.0)]
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance between two points, in meters.
///
/// Inputs are expected to satisfy the ranges documented on [`Coordinate`];
/// the result for non-finite input is unspecified.
#[must_use]
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let central_angle = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * central_angle
}

/// Whether `b` lies within `threshold_m` meters of `a`. The boundary counts.
#[must_use]
pub fn within_radius(a: Coordinate, b: Coordinate, threshold_m: f64) -> bool {
    distance_m(a, b) <= threshold_m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[test]
    fn test_identical_points_are_zero_apart() {
        let p = point(1.0, 2.0);
        assert!(distance_m(p, p).abs() < f64::EPSILON);
        assert!(within_radius(p, p, 0.0));
        assert!(within_radius(p, p, 50.0));
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point(48.8566, 2.3522);
        let b = point(51.5074, -0.1278);
        assert!((distance_m(a, b) - distance_m(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance_paris_london() {
        let paris = point(48.8566, 2.3522);
        let london = point(51.5074, -0.1278);
        let km = distance_m(paris, london) / 1000.0;
        assert!((km - 343.5).abs() < 1.0, "got {km} km");
    }

    #[test]
    fn test_hundredth_degree_of_latitude_is_about_1112_m() {
        let d = distance_m(point(1.0, 2.0), point(1.01, 2.0));
        assert!((d - 1111.95).abs() < 1.0, "got {d} m");
        assert!(!within_radius(point(1.0, 2.0), point(1.01, 2.0), 50.0));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let a = point(10.0, 20.0);
        let b = point(10.0003, 20.0002);
        let d = distance_m(a, b);
        assert!(within_radius(a, b, d));
        assert!(!within_radius(a, b, d - 1e-6));
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance_m(point(0.0, 0.0), point(0.0, 180.0));
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - half_circumference).abs() < 1.0);
    }

    #[test]
    fn test_coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(-90.0, -180.0).is_some());
        assert!(Coordinate::new(90.1, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_none());
    }
}
