use std::collections::HashSet;
use std::sync::Arc;

use super::propagation::SatelliteSnapshot;

/// Snapshots inside the geofence, nearest first.
/// Equal distances keep catalog order. Names are unique: when the catalog
/// repeats a name, only the nearest of those entries is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProximitySet {
    entries: Arc<[SatelliteSnapshot]>,
}

impl ProximitySet {
    pub fn within(snapshots: &[SatelliteSnapshot], threshold_km: f64) -> Self {
        let mut near: Vec<SatelliteSnapshot> = snapshots
            .iter()
            .filter(|snap| snap.distance_km <= threshold_km)
            .cloned()
            .collect();

        // input arrives in catalog order and sort_by is stable
        near.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        let mut seen = HashSet::new();
        near.retain(|snap| seen.insert(snap.name.clone()));

        Self { entries: near.into() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SatelliteSnapshot> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[SatelliteSnapshot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|snap| snap.name == name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::PROXIMITY_THRESHOLD_KM;

    pub(crate) fn snap(name: &str, catalog_index: usize, distance_km: f64) -> SatelliteSnapshot {
        SatelliteSnapshot {
            name: name.to_string(),
            catalog_index,
            distance_km,
            nadir_lat: 0.0,
            nadir_lon: 0.0,
            altitude_km: 550.0,
            speed_kmh: 27_000.0,
        }
    }

    fn names(set: &ProximitySet) -> Vec<&str> {
        set.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn threshold_is_inclusive() {
        let snapshots = [snap("AT", 0, 200.0), snap("OVER", 1, 200.0001), snap("IN", 2, 12.5)];
        let set = ProximitySet::within(&snapshots, PROXIMITY_THRESHOLD_KM);

        assert_eq!(names(&set), ["IN", "AT"]);
        assert!(!set.contains("OVER"));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let snapshots = [
            snap("C", 0, 50.0),
            snap("A", 1, 10.0),
            snap("B", 2, 50.0),
            snap("D", 3, 10.0),
        ];
        let set = ProximitySet::within(&snapshots, PROXIMITY_THRESHOLD_KM);

        assert_eq!(names(&set), ["A", "D", "C", "B"]);
    }

    #[test]
    fn repeated_name_keeps_nearest_entry() {
        let mut far = snap("DUP", 0, 20.0);
        far.nadir_lat = 2.0;
        let mut near = snap("DUP", 3, 10.0);
        near.nadir_lat = 1.0;

        let set = ProximitySet::within(&[far, snap("OTHER", 1, 15.0), near], PROXIMITY_THRESHOLD_KM);

        assert_eq!(names(&set), ["DUP", "OTHER"]);
        assert_eq!(set.as_slice()[0].catalog_index, 3);
        assert_eq!(set.as_slice()[0].nadir_lat, 1.0);
    }

    #[test]
    fn nan_distance_never_matches() {
        let set = ProximitySet::within(&[snap("NAN", 0, f64::NAN)], PROXIMITY_THRESHOLD_KM);
        assert!(set.is_empty());
    }
}
