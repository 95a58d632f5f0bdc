//! Geodesy primitives (C1): great-circle distance, bearing, destination and
//! interpolation on a sphere. All operations are pure.
//!
//! Grounded on the teacher's `engine::router::IsochroneRouter` helpers
//! (`calculate_bearing`, `calculate_distance`, `calculate_destination`),
//! generalized from meters/Earth-radius-in-meters to nautical miles per the
//! spec's unit convention, with a `Coordinate` type lifted from
//! `engine::models` and normalized longitude enforced at construction.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in nautical miles, per spec §4.1.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// A geographic point: latitude in `[-90, 90]`, longitude normalized to
/// `(-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon: normalize_longitude(lon) }
    }

    pub fn is_valid(&self) -> bool {
        self.lat >= -90.0 && self.lat <= 90.0
    }
}

/// Normalizes any real longitude into `(-180, 180]`.
pub fn normalize_longitude(lon: f64) -> f64 {
    let mut x = lon % 360.0;
    if x <= -180.0 {
        x += 360.0;
    } else if x > 180.0 {
        x -= 360.0;
    }
    x
}

/// Clamps an `asin`/`acos` argument into `[-1, 1]` to absorb floating-point
/// overshoot near the poles/antipodes.
fn clamp_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

/// Haversine great-circle distance in nautical miles.
pub fn great_circle_distance(p1: Coordinate, p2: Coordinate) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lon = (p2.lon - p1.lon).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * clamp_unit(a.sqrt()).asin();
    EARTH_RADIUS_NM * c
}

/// Initial bearing from `p1` to `p2`, in degrees `[0, 360)`.
pub fn bearing(p1: Coordinate, p2: Coordinate) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let d_lon = (p2.lon - p1.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    let mut deg = y.atan2(x).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    deg
}

/// Destination point given a start, a distance in nautical miles, and a
/// bearing in degrees.
pub fn destination(p: Coordinate, distance_nm: f64, bearing_deg: f64) -> Coordinate {
    let angular_dist = distance_nm / EARTH_RADIUS_NM;
    let bearing_rad = bearing_deg.to_radians();
    let lat1 = p.lat.to_radians();
    let lon1 = p.lon.to_radians();

    let lat2 = clamp_unit(lat1.sin() * angular_dist.cos() + lat1.cos() * angular_dist.sin() * bearing_rad.cos())
        .asin();
    let lon2 = lon1
        + (bearing_rad.sin() * angular_dist.sin() * lat1.cos())
            .atan2(angular_dist.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Angular distance below which two points are considered coincident.
const ANGULAR_EPSILON: f64 = 1e-10;

/// Interpolates along the great circle between `p1` and `p2` at fraction
/// `t ∈ [0, 1]`. Uses linear interpolation for short segments (<5° angular
/// separation) and spherical slerp otherwise, per spec §4.1.
pub fn interpolate_gc(p1: Coordinate, p2: Coordinate, t: f64) -> Coordinate {
    if t <= 0.0 {
        return p1;
    }
    if t >= 1.0 {
        return p2;
    }

    let angular_dist = great_circle_distance(p1, p2) / EARTH_RADIUS_NM;
    if angular_dist < ANGULAR_EPSILON {
        return p1;
    }

    if angular_dist.to_degrees() < 5.0 {
        return Coordinate::new(
            p1.lat + (p2.lat - p1.lat) * t,
            p1.lon + (p2.lon - p1.lon) * t,
        );
    }

    let lat1 = p1.lat.to_radians();
    let lon1 = p1.lon.to_radians();
    let lat2 = p2.lat.to_radians();
    let lon2 = p2.lon.to_radians();

    let sin_d = angular_dist.sin();
    let a = ((1.0 - t) * angular_dist).sin() / sin_d;
    let b = (t * angular_dist).sin() / sin_d;

    let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
    let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
    let z = a * lat1.sin() + b * lat2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);

    Coordinate::new(lat.to_degrees(), lon.to_degrees())
}

/// Samples a great-circle segment at roughly `interval_nm` spacing, with a
/// floor of `min_samples` points (used by segment-crossing tests in C2/C4).
pub fn sample_segment(p1: Coordinate, p2: Coordinate, interval_nm: f64, min_samples: usize) -> Vec<Coordinate> {
    let distance = great_circle_distance(p1, p2);
    let by_interval = if interval_nm > 0.0 {
        (distance / interval_nm).ceil() as usize + 1
    } else {
        min_samples
    };
    let n = by_interval.max(min_samples).max(2);

    (0..n)
        .map(|i| interpolate_gc(p1, p2, i as f64 / (n - 1) as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinate::new(41.0082, 28.9784);
        assert_relative_eq!(great_circle_distance(p, p), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let p1 = Coordinate::new(41.0082, 28.9784);
        let p2 = Coordinate::new(40.8518, 14.2681);
        assert_relative_eq!(
            great_circle_distance(p1, p2),
            great_circle_distance(p2, p1),
            epsilon = 1e-9
        );
    }

    #[test]
    fn destination_round_trips_distance() {
        let p = Coordinate::new(37.9416, 23.6470);
        for &(d, b) in &[(100.0, 45.0), (500.0, 270.0), (1200.0, 10.0)] {
            let dest = destination(p, d, b);
            let back = great_circle_distance(p, dest);
            assert!((back - d).abs() / d < 0.005, "distance {} vs expected {}", back, d);
        }
    }

    #[test]
    fn longitude_normalizes_into_range() {
        let c = Coordinate::new(0.0, 200.0);
        assert!(c.lon > -180.0 && c.lon <= 180.0);
        let c2 = Coordinate::new(0.0, -200.0);
        assert!(c2.lon > -180.0 && c2.lon <= 180.0);
    }

    #[test]
    fn interpolate_endpoints() {
        let p1 = Coordinate::new(41.0, 29.0);
        let p2 = Coordinate::new(40.0, 14.0);
        let a = interpolate_gc(p1, p2, 0.0);
        let b = interpolate_gc(p1, p2, 1.0);
        assert_relative_eq!(a.lat, p1.lat, epsilon = 1e-9);
        assert_relative_eq!(b.lat, p2.lat, epsilon = 1e-9);
    }

    #[test]
    fn sample_segment_has_minimum_samples() {
        let p1 = Coordinate::new(41.0, 29.0);
        let p2 = Coordinate::new(40.99, 29.01);
        let samples = sample_segment(p1, p2, 2.0 / 60.0, 20);
        assert!(samples.len() >= 20);
    }
}
