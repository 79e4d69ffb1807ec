//! identity.rs
//!
//! Palette slots and marker bookkeeping for satellites inside the geofence.
//! Produces marker operations for the map host; never touches the map itself.

use std::collections::BTreeMap;

use super::proximity::ProximitySet;
use crate::config::PALETTE;
use crate::geo::LatLng;

/// Index into the marker palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaletteSlot(pub usize);

impl PaletteSlot {
    pub fn style(self) -> &'static str {
        PALETTE[self.0 % PALETTE.len()].0
    }

    pub fn hex(self) -> &'static str {
        PALETTE[self.0 % PALETTE.len()].1
    }
}

/// One change to apply to the map host's marker set.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerOp {
    Create {
        name: String,
        position: LatLng,
        slot: PaletteSlot,
        audio_cue: bool,
    },
    Move {
        name: String,
        position: LatLng,
    },
    Remove {
        name: String,
    },
}

impl MarkerOp {
    pub fn name(&self) -> &str {
        match self {
            MarkerOp::Create { name, .. } | MarkerOp::Move { name, .. } | MarkerOp::Remove { name } => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityManager {
    palette_size: usize,
    // only ever advances, wrapping at palette_size
    cursor: usize,
    assignments: BTreeMap<String, PaletteSlot>,
    markers: BTreeMap<String, LatLng>,
}

impl Default for IdentityManager {
    fn default() -> Self {
        Self::new(PALETTE.len())
    }
}

impl IdentityManager {
    pub fn new(palette_size: usize) -> Self {
        Self {
            palette_size: palette_size.max(1),
            cursor: 0,
            assignments: BTreeMap::new(),
            markers: BTreeMap::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn slot_of(&self, name: &str) -> Option<PaletteSlot> {
        self.assignments.get(name).copied()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.markers.keys().map(String::as_str)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Bring the marker set in line with `proximity`.
    pub fn reconcile(&mut self, proximity: &ProximitySet, tracking: bool, audio: bool) -> Vec<MarkerOp> {
        // departed satellites lose their marker and their slot
        let departed: Vec<String> = self
            .markers
            .keys()
            .filter(|name| !proximity.contains(name))
            .cloned()
            .collect();

        let mut ops = Vec::new();
        for name in departed {
            self.markers.remove(&name);
            self.assignments.remove(&name);
            ops.push(MarkerOp::Remove { name });
        }

        if !tracking || proximity.is_empty() {
            ops.extend(self.clear());
            return ops;
        }

        // new arrivals get slots in catalog order, whatever their distance
        let mut arrivals: Vec<_> = proximity
            .iter()
            .filter(|snap| !self.assignments.contains_key(&snap.name))
            .collect();
        arrivals.sort_by_key(|snap| snap.catalog_index);
        for snap in arrivals {
            if self.assignments.contains_key(&snap.name) {
                continue;
            }
            self.assignments.insert(snap.name.clone(), PaletteSlot(self.cursor));
            self.cursor = (self.cursor + 1) % self.palette_size;
        }

        for snap in proximity.iter() {
            let position = snap.nadir();
            let slot = self.assignments[&snap.name];

            if self.markers.insert(snap.name.clone(), position).is_some() {
                ops.push(MarkerOp::Move { name: snap.name.clone(), position });
            } else {
                ops.push(MarkerOp::Create {
                    name: snap.name.clone(),
                    position,
                    slot,
                    audio_cue: audio,
                });
            }
        }

        ops
    }

    /// Drop every marker and assignment. The cursor keeps its value.
    pub fn clear(&mut self) -> Vec<MarkerOp> {
        self.assignments.clear();
        std::mem::take(&mut self.markers)
            .into_keys()
            .map(|name| MarkerOp::Remove { name })
            .collect()
    }

    /// Full teardown for the end of a tracking session.
    pub fn reset(&mut self) -> Vec<MarkerOp> {
        self.cursor = 0;
        self.clear()
    }
}
