use bevy::prelude::*;
use chrono::{DateTime, Utc};

use super::tle::{CompiledState, ElementSetRecord};
use crate::geo::{self, LatLng};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropagationFailure {
    #[error("element set did not compile: {0}")]
    InvalidElements(String),
    #[error("instant is out of range for this element set")]
    EpochOutOfRange,
    #[error("propagation failed: {0}")]
    Diverged(String),
    #[error("non-finite state vector")]
    NonFinite,
}

/// Result of propagating one element set to one instant.
/// Position in km, velocity in km/s, both in the inertial (TEME) frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationOutcome {
    Success { position: [f64; 3], velocity: [f64; 3] },
    Failure(PropagationFailure),
}

pub trait OrbitModel: Send + Sync {
    fn propagate(&self, record: &ElementSetRecord, at: DateTime<Utc>) -> PropagationOutcome;
}

/// SGP4 via the `sgp4` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sgp4Model;

impl OrbitModel for Sgp4Model {
    fn propagate(&self, record: &ElementSetRecord, at: DateTime<Utc>) -> PropagationOutcome {
        let (elements, constants) = match &record.compiled {
            CompiledState::Ready { elements, constants } => (elements, constants),
            CompiledState::Invalid(reason) => {
                return PropagationOutcome::Failure(PropagationFailure::InvalidElements(reason.clone()));
            }
        };

        let minutes = match elements.datetime_to_minutes_since_epoch(&at.naive_utc()) {
            Ok(minutes) => minutes,
            Err(_) => return PropagationOutcome::Failure(PropagationFailure::EpochOutOfRange),
        };

        match constants.propagate(minutes) {
            Ok(prediction) => {
                let finite = prediction
                    .position
                    .iter()
                    .chain(prediction.velocity.iter())
                    .all(|v| v.is_finite());
                if !finite {
                    return PropagationOutcome::Failure(PropagationFailure::NonFinite);
                }

                PropagationOutcome::Success {
                    position: prediction.position,
                    velocity: prediction.velocity,
                }
            }
            Err(err) => PropagationOutcome::Failure(PropagationFailure::Diverged(err.to_string())),
        }
    }
}

/// Where one satellite is right now, relative to the reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteSnapshot {
    pub name: String,
    pub catalog_index: usize,
    pub distance_km: f64,
    pub nadir_lat: f64,
    pub nadir_lon: f64,
    pub altitude_km: f64,
    pub speed_kmh: f64,
}

impl SatelliteSnapshot {
    pub fn nadir(&self) -> LatLng {
        LatLng::new(self.nadir_lat, self.nadir_lon)
    }
}

pub fn speed_kmh(velocity: [f64; 3]) -> f64 {
    let [vx, vy, vz] = velocity;
    (vx.powi(2) + vy.powi(2) + vz.powi(2)).sqrt() * 3600.0
}

/// Propagate every record to `at`. Failures are left out of the result.
pub fn propagate_all(
    records: &[ElementSetRecord],
    model: &dyn OrbitModel,
    reference: LatLng,
    at: DateTime<Utc>,
) -> Vec<SatelliteSnapshot> {
    let gmst = geo::sidereal_time(at);
    let mut snapshots = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (catalog_index, record) in records.iter().enumerate() {
        let (position, velocity) = match model.propagate(record, at) {
            PropagationOutcome::Success { position, velocity } => (position, velocity),
            PropagationOutcome::Failure(_) => {
                skipped += 1;
                continue;
            }
        };

        let geodetic = geo::eci_to_geodetic(position, gmst);
        let nadir = LatLng::new(geo::degrees_lat(geodetic.latitude), geo::degrees_long(geodetic.longitude));

        snapshots.push(SatelliteSnapshot {
            name: record.name.clone(),
            catalog_index,
            distance_km: geo::haversine_km(reference, nadir),
            nadir_lat: nadir.lat,
            nadir_lon: nadir.lng,
            altitude_km: geodetic.height,
            speed_kmh: speed_kmh(velocity),
        });
    }

    debug!("Propagated {} satellites, skipped {skipped}", snapshots.len());
    snapshots
}
