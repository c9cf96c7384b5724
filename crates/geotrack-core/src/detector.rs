//! Geometric enter/exit classification.
//!
//! Distances are great-circle distances on a sphere with the mean Earth
//! radius. The sample's accuracy widens the region, so an uncertain fix near
//! the boundary is classified as inside.

use crate::types::{LocationSample, TransitionKind};
use crate::waypoint::Waypoint;

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in metres between two points given in degrees.
#[must_use]
pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Classify `sample` against `waypoint`.
///
/// `Enter` iff the distance to the centre is at most radius plus accuracy.
#[must_use]
pub fn classify(sample: &LocationSample, waypoint: &Waypoint) -> TransitionKind {
    let distance = distance_m(
        sample.latitude,
        sample.longitude,
        waypoint.latitude,
        waypoint.longitude,
    );
    if distance <= waypoint.radius + sample.accuracy {
        TransitionKind::Enter
    } else {
        TransitionKind::Exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn waypoint(radius: f64) -> Waypoint {
        Waypoint::new(1, "Centre", 0.0, 0.0, radius, Utc::now())
    }

    /// Metres per degree of latitude on the model sphere.
    fn metres_per_degree() -> f64 {
        EARTH_RADIUS_M * std::f64::consts::PI / 180.0
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        assert!(distance_m(52.52, 13.405, 52.52, 13.405).abs() < 1e-6);
    }

    #[test]
    fn test_distance_berlin_to_paris() {
        // Roughly 878 km.
        let d = distance_m(52.5200, 13.4050, 48.8566, 2.3522);
        assert!((d - 877_500.0).abs() < 5_000.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = distance_m(10.0, 20.0, -30.0, 40.0);
        let b = distance_m(-30.0, 40.0, 10.0, 20.0);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_centre_is_enter() {
        let sample = LocationSample::new(0.0, 0.0, 5.0, Utc::now());
        assert_eq!(classify(&sample, &waypoint(100.0)), TransitionKind::Enter);
    }

    #[test]
    fn test_accuracy_widens_region() {
        // 150 m north of the centre.
        let lat = 150.0 / metres_per_degree();
        let precise = LocationSample::new(lat, 0.0, 10.0, Utc::now());
        let fuzzy = LocationSample::new(lat, 0.0, 60.0, Utc::now());

        assert_eq!(classify(&precise, &waypoint(100.0)), TransitionKind::Exit);
        assert_eq!(classify(&fuzzy, &waypoint(100.0)), TransitionKind::Enter);
    }

    #[test]
    fn test_far_sample_is_exit() {
        let sample = LocationSample::new(1.0, 1.0, 20.0, Utc::now());
        assert_eq!(classify(&sample, &waypoint(500.0)), TransitionKind::Exit);
    }
}
