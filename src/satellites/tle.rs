use std::fmt;
use std::sync::Arc;

use bevy::prelude::*;

/// SGP4 state compiled once per element set.
/// Records whose lines are rejected by SGP4 are kept with the reason, so that
/// catalog order survives and the satellite just fails every propagation.
pub enum CompiledState {
    Ready {
        elements: sgp4::Elements,
        constants: sgp4::Constants,
    },
    Invalid(String),
}

impl CompiledState {
    pub fn compile(name: &str, line1: &str, line2: &str) -> Self {
        // let the SGP4 library do the heavy lifting
        let elements = match sgp4::Elements::from_tle(
            Some(name.to_string()),
            line1.as_bytes(),
            line2.as_bytes(),
        ) {
            Ok(elements) => elements,
            Err(err) => return CompiledState::Invalid(err.to_string()),
        };

        match sgp4::Constants::from_elements(&elements) {
            Ok(constants) => CompiledState::Ready { elements, constants },
            Err(err) => CompiledState::Invalid(err.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CompiledState::Ready { .. })
    }
}

impl fmt::Debug for CompiledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledState::Ready { elements, .. } => f
                .debug_struct("Ready")
                .field("norad_id", &elements.norad_id)
                .field("epoch", &elements.datetime)
                .finish(),
            CompiledState::Invalid(reason) => f.debug_tuple("Invalid").field(reason).finish(),
        }
    }
}

/// One catalog entry: name line plus the two element lines.
#[derive(Debug)]
pub struct ElementSetRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub compiled: CompiledState,
}

impl ElementSetRecord {
    pub fn new(name: &str, line1: &str, line2: &str) -> Self {
        let name = name.trim();
        let line1 = line1.trim();
        let line2 = line2.trim();

        Self {
            compiled: CompiledState::compile(name, line1, line2),
            name: name.to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        }
    }
}

/// Element sets shared read-only between the loader and the scheduler.
pub type ElementSets = Arc<[ElementSetRecord]>;

// split raw catalog text into records
// note: a record is always 3 lines, a trailing partial group is dropped
pub fn parse_catalog(text: &str) -> Vec<ElementSetRecord> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let records: Vec<ElementSetRecord> = lines
        .chunks_exact(3)
        .map(|chunk| ElementSetRecord::new(chunk[0], chunk[1], chunk[2]))
        .collect();

    let dropped = lines.len() % 3;
    if dropped > 0 {
        debug!("Dropped {dropped} trailing catalog line(s)");
    }

    let invalid = records.iter().filter(|r| !r.compiled.is_ready()).count();
    if invalid > 0 {
        warn!("{invalid} of {} element sets failed to compile", records.len());
    }

    records
}
