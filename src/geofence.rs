use crate::config::{EARTH_CIRCUMFERENCE_M, TILE_SIZE_PX};

/// Web-Mercator zoom at which `diameter_px` screen pixels span `ground_diameter_m`
/// metres at `latitude_deg`.
///
/// Ground resolution at zoom `z` is `C * cos(lat) / (256 * 2^z)` metres per pixel,
/// solved here for `z`. Returns `None` when no zoom level can satisfy the request
/// (empty circle, non-positive ground size, or a pole).
pub fn zoom_for_diameter(diameter_px: f64, latitude_deg: f64, ground_diameter_m: f64) -> Option<f64> {
    let valid_circle = diameter_px.is_finite() && diameter_px > 0.0 && ground_diameter_m > 0.0;
    // cos(90deg) is not exactly zero in floating point
    let below_pole = latitude_deg.is_finite() && latitude_deg.abs() < 90.0;
    if !valid_circle || !below_pole {
        return None;
    }

    let cos_lat = latitude_deg.to_radians().cos();

    let metres_per_px = ground_diameter_m / diameter_px;
    let zoom = ((EARTH_CIRCUMFERENCE_M * cos_lat) / (TILE_SIZE_PX * metres_per_px)).log2();
    zoom.is_finite().then_some(zoom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GEOFENCE_GROUND_DIAMETER_M;
    use approx::assert_relative_eq;

    #[test]
    fn equator_300px() {
        let zoom = zoom_for_diameter(300.0, 0.0, GEOFENCE_GROUND_DIAMETER_M).unwrap();
        assert_relative_eq!(zoom, 6.875378, epsilon = 1e-5);
    }

    #[test]
    fn higher_latitude_zooms_out() {
        let at_45 = zoom_for_diameter(300.0, 45.0, GEOFENCE_GROUND_DIAMETER_M).unwrap();
        let at_0 = zoom_for_diameter(300.0, 0.0, GEOFENCE_GROUND_DIAMETER_M).unwrap();

        assert!(at_0 > at_45);
        // cos(45) = 1/sqrt(2), so exactly half a zoom level apart
        assert_relative_eq!(at_0 - at_45, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn doubling_the_circle_adds_one_level() {
        let small = zoom_for_diameter(300.0, 30.0, GEOFENCE_GROUND_DIAMETER_M).unwrap();
        let large = zoom_for_diameter(600.0, 30.0, GEOFENCE_GROUND_DIAMETER_M).unwrap();
        assert_relative_eq!(large - small, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(zoom_for_diameter(0.0, 0.0, GEOFENCE_GROUND_DIAMETER_M), None);
        assert_eq!(zoom_for_diameter(-5.0, 0.0, GEOFENCE_GROUND_DIAMETER_M), None);
        assert_eq!(zoom_for_diameter(300.0, 90.0, GEOFENCE_GROUND_DIAMETER_M), None);
        assert_eq!(zoom_for_diameter(300.0, 0.0, 0.0), None);
    }
}
