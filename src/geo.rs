//! geo.rs
//!
//! Coordinate helpers: great-circle distance, sidereal time and
//! inertial <-> geodetic conversion on the WGS-84 ellipsoid.

use std::f64::consts::PI;

use chrono::{DateTime, Utc};

use crate::config::{EARTH_RADIUS_KM, WGS84_A_KM, WGS84_B_KM};

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Geodetic position, angles in radians and height in km.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

// great-circle distance in km
// https://en.wikipedia.org/wiki/Haversine_formula
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // rounding can push h just past 1 near antipodes
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Greenwich mean sidereal time in radians.
pub fn sidereal_time(at: DateTime<Utc>) -> f64 {
    let naive = at.naive_utc();
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&naive))
}

fn flattening() -> f64 {
    (WGS84_A_KM - WGS84_B_KM) / WGS84_A_KM
}

fn eccentricity_sq() -> f64 {
    let f = flattening();
    2.0 * f - f * f
}

// wrap angle into [-PI, PI]
fn wrap_pi(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Convert an inertial (TEME) position in km to geodetic coordinates.
/// Latitude is solved iteratively; a handful of passes converge for any orbit.
pub fn eci_to_geodetic(position: [f64; 3], gmst: f64) -> Geodetic {
    let [x, y, z] = position;
    let e2 = eccentricity_sq();
    let r = (x * x + y * y).sqrt();

    let longitude = wrap_pi(y.atan2(x) - gmst);

    let mut latitude = z.atan2(r);
    for _ in 0..20 {
        let previous = latitude;
        let c = 1.0 / (1.0 - e2 * previous.sin().powi(2)).sqrt();
        latitude = (z + WGS84_A_KM * c * e2 * previous.sin()).atan2(r);

        if (latitude - previous).abs() < 1e-12 {
            break;
        }
    }

    // stays finite over the poles, unlike r / cos(lat)
    let (sin_lat, cos_lat) = latitude.sin_cos();
    let height = r * cos_lat + z * sin_lat - WGS84_A_KM * (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Geodetic { latitude, longitude, height }
}

/// Inverse of [`eci_to_geodetic`], used to place known points in inertial space.
pub fn geodetic_to_eci(geodetic: Geodetic, gmst: f64) -> [f64; 3] {
    let e2 = eccentricity_sq();
    let sin_lat = geodetic.latitude.sin();
    let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    let theta = geodetic.longitude + gmst;
    let horizontal = (n + geodetic.height) * geodetic.latitude.cos();

    [
        horizontal * theta.cos(),
        horizontal * theta.sin(),
        (n * (1.0 - e2) + geodetic.height) * sin_lat,
    ]
}

/// Latitude in degrees, clamped to [-90, 90].
pub fn degrees_lat(radians: f64) -> f64 {
    radians.to_degrees().clamp(-90.0, 90.0)
}

/// Longitude in degrees, wrapped into [-180, 180].
pub fn degrees_long(radians: f64) -> f64 {
    wrap_pi(radians).to_degrees()
}

pub fn wrap_longitude(degrees: f64) -> f64 {
    if (-180.0..=180.0).contains(&degrees) {
        degrees
    } else {
        (degrees + 180.0).rem_euclid(360.0) - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn haversine_is_symmetric() {
        let points = [
            LatLng::new(0.0, 0.0),
            LatLng::new(51.4779, -0.0015),
            LatLng::new(-33.8688, 151.2093),
            LatLng::new(89.9, 179.9),
        ];

        for a in points {
            assert_eq!(haversine_km(a, a), 0.0);
            for b in points {
                assert_relative_eq!(haversine_km(a, b), haversine_km(b, a), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn one_degree_diagonal_from_origin() {
        let d = haversine_km(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
        assert_relative_eq!(d, 157.2, epsilon = 0.1);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_km(LatLng::new(0.0, 0.0), LatLng::new(0.0, 180.0));
        assert_relative_eq!(d, PI * EARTH_RADIUS_KM, epsilon = 1e-6);
    }

    #[test]
    fn near_antipodes_stay_finite() {
        for i in 0..2000 {
            let lat = -89.0 + (i as f64) * 0.089;
            let lng = -179.0 + (i as f64) * 0.179;
            let a = LatLng::new(lat, lng);
            let b = LatLng::new(-lat, wrap_longitude(lng + 180.0 - 1e-9));

            let d = haversine_km(a, b);
            assert!(d.is_finite() && d >= 0.0, "{a:?} -> {b:?} gave {d}");
            assert!(d <= PI * EARTH_RADIUS_KM);
        }
    }

    #[test]
    fn geodetic_round_trip() {
        let gmst = 1.234;
        let original = Geodetic {
            latitude: 1.0_f64.to_radians(),
            longitude: (-72.5_f64).to_radians(),
            height: 550.0,
        };

        let back = eci_to_geodetic(geodetic_to_eci(original, gmst), gmst);
        assert_relative_eq!(back.latitude, original.latitude, epsilon = 1e-9);
        assert_relative_eq!(back.longitude, original.longitude, epsilon = 1e-9);
        assert_relative_eq!(back.height, original.height, epsilon = 1e-6);
    }

    #[test]
    fn polar_point_has_polar_radius() {
        let g = eci_to_geodetic([0.0, 0.0, WGS84_B_KM + 100.0], 0.0);
        assert_relative_eq!(g.latitude, PI / 2.0, epsilon = 1e-9);
        assert_relative_eq!(g.height, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn longitude_wraps() {
        assert_relative_eq!(degrees_long(3.0 * PI / 2.0), -90.0, epsilon = 1e-9);
        assert_relative_eq!(wrap_longitude(190.0), -170.0, epsilon = 1e-9);
        assert_relative_eq!(wrap_longitude(-540.0), -180.0, epsilon = 1e-9);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(degrees_lat(PI), 90.0);
    }
}
