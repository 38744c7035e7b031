//! Unit identity types.
//!
//! A monitored unit is identified by its index in the fleet, fixed at
//! construction time and valid in `[0, nb_units)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit ID wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub usize);

impl UnitId {
    /// Index into per-unit storage.
    pub fn index(self) -> usize {
        self.0
    }

    /// Whether this id addresses a unit in a fleet of `nb_units`.
    pub fn in_range(self, nb_units: usize) -> bool {
        self.0 < nb_units
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

impl From<usize> for UnitId {
    fn from(id: usize) -> Self {
        UnitId(id)
    }
}
