//! Proximity satellite tracker: which satellites are passing over the
//! point at the center of the map, refreshed every few seconds.

pub mod config;
pub mod geo;
pub mod geofence;
pub mod satellites;
pub mod session;
pub mod systems;
