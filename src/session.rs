//! session.rs
//!
//! The tracking pipeline: reference point -> propagation -> proximity -> identity.
//! One `Tracker` lives for the whole app; a `TrackingSession` exists only while
//! watch mode is on and owns every piece of per-session state.

use std::sync::Arc;

use bevy::prelude::*;
use chrono::{DateTime, Utc};

use crate::config::{MIN_ZOOM, TrackerConfig};
use crate::geo::{LatLng, wrap_longitude};
use crate::geofence::zoom_for_diameter;
use crate::satellites::{ElementSets, IdentityManager, MarkerOp, OrbitModel, PaletteSlot, ProximitySet, SatelliteSnapshot, propagate_all};

/// Latest view center reported by the map host.
/// Sampled once at the start of every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferencePoint {
    center: LatLng,
}

impl ReferencePoint {
    pub fn observe(&mut self, center: LatLng) {
        self.center = LatLng::new(center.lat.clamp(-90.0, 90.0), wrap_longitude(center.lng));
    }

    pub fn sample(&self) -> LatLng {
        self.center
    }
}

/// What the map host has to do to its view when the mode changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewCommand {
    /// Lock pan/zoom, and set the zoom when one could be computed.
    Lock { zoom: Option<f64> },
    /// Unlock pan/zoom and return to the canonical view.
    Release { center: LatLng, zoom: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeChange {
    pub ops: Vec<MarkerOp>,
    pub view: ViewCommand,
}

#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub reference: LatLng,
    pub on_screen_diameter_px: f64,
    pub zoom: Option<f64>,
    pub audio: bool,
    identity: IdentityManager,
}

impl TrackingSession {
    pub fn on_screen_radius_px(&self) -> f64 {
        self.on_screen_diameter_px / 2.0
    }

    pub fn identity(&self) -> &IdentityManager {
        &self.identity
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingParams {
    pub proximity_threshold_km: f64,
    pub ground_diameter_m: f64,
}

impl From<&TrackerConfig> for TrackingParams {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            proximity_threshold_km: config.proximity_threshold_km,
            ground_diameter_m: config.geofence_ground_diameter_m,
        }
    }
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

pub struct Tracker {
    params: TrackingParams,
    model: Box<dyn OrbitModel>,
    elements: Option<ElementSets>,
    reference: ReferencePoint,
    session: Option<TrackingSession>,
    snapshots: Arc<[SatelliteSnapshot]>,
    proximity: ProximitySet,
}

impl Tracker {
    pub fn new(model: Box<dyn OrbitModel>, params: TrackingParams) -> Self {
        Self {
            params,
            model,
            elements: None,
            reference: ReferencePoint::default(),
            session: None,
            snapshots: Arc::from(Vec::new()),
            proximity: ProximitySet::default(),
        }
    }

    pub fn set_element_sets(&mut self, elements: ElementSets) {
        self.elements = Some(elements);
    }

    pub fn element_count(&self) -> usize {
        self.elements.as_ref().map_or(0, |e| e.len())
    }

    pub fn has_element_sets(&self) -> bool {
        self.element_count() > 0
    }

    pub fn observe_center(&mut self, center: LatLng) {
        self.reference.observe(center);
    }

    pub fn reference(&self) -> LatLng {
        self.reference.sample()
    }

    pub fn session(&self) -> Option<&TrackingSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn snapshots(&self) -> &[SatelliteSnapshot] {
        &self.snapshots
    }

    pub fn proximity(&self) -> &ProximitySet {
        &self.proximity
    }

    pub fn slot_of(&self, name: &str) -> Option<PaletteSlot> {
        self.session.as_ref()?.identity.slot_of(name)
    }

    /// Start a session. Entering again while active starts over.
    pub fn enable(&mut self, on_screen_diameter_px: f64, audio: bool) -> ModeChange {
        let ops = self.end_session();

        let reference = self.reference.sample();
        let zoom = zoom_for_diameter(on_screen_diameter_px, reference.lat, self.params.ground_diameter_m);
        if zoom.is_none() {
            warn!("No zoom level fits a {on_screen_diameter_px}px geofence at {:.4}", reference.lat);
        }

        info!("Watch mode on at ({:.4}, {:.4}), zoom {:?}", reference.lat, reference.lng, zoom);
        self.session = Some(TrackingSession {
            reference,
            on_screen_diameter_px,
            zoom,
            audio,
            identity: IdentityManager::default(),
        });

        ModeChange { ops, view: ViewCommand::Lock { zoom } }
    }

    /// End the session, clearing every marker before returning.
    pub fn disable(&mut self) -> ModeChange {
        let ops = self.end_session();
        info!("Watch mode off, cleared {} markers", ops.len());

        let origin = LatLng::default();
        self.reference.observe(origin);

        ModeChange {
            ops,
            view: ViewCommand::Release { center: origin, zoom: MIN_ZOOM },
        }
    }

    fn end_session(&mut self) -> Vec<MarkerOp> {
        self.snapshots = Arc::from(Vec::new());
        self.proximity = ProximitySet::default();

        match self.session.take() {
            Some(mut session) => session.identity.reset(),
            None => Vec::new(),
        }
    }

    /// Silence audio cues for the rest of the session.
    pub fn mute(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.audio = false;
        }
    }

    /// One scheduler pass. `None` when there is nothing to run:
    /// no session, or no element sets.
    pub fn tick(&mut self, at: DateTime<Utc>) -> Option<Vec<MarkerOp>> {
        let session = self.session.as_mut()?;
        let elements = self.elements.as_ref().filter(|e| !e.is_empty())?;

        let reference = self.reference.sample();
        let snapshots: Arc<[SatelliteSnapshot]> = propagate_all(elements, self.model.as_ref(), reference, at).into();
        let proximity = ProximitySet::within(&snapshots, self.params.proximity_threshold_km);

        let ops = session.identity.reconcile(&proximity, true, session.audio);

        self.snapshots = snapshots;
        self.proximity = proximity;
        Some(ops)
    }
}
