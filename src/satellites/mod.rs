//! Satellite side of the tracker: element sets, propagation,
//! proximity ranking and marker identity.

pub mod cache;
pub mod identity;
pub mod propagation;
pub mod proximity;
pub mod tle;

pub use cache::{CatalogError, CatalogSource, ElementSetCache, FileStore, HttpCatalog, KeyValueStore, MemoryStore};
pub use identity::{IdentityManager, MarkerOp, PaletteSlot};
pub use propagation::{OrbitModel, PropagationOutcome, SatelliteSnapshot, Sgp4Model, propagate_all};
pub use proximity::ProximitySet;
pub use tle::{ElementSetRecord, ElementSets, parse_catalog};
