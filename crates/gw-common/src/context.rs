//! Per-step deviation verdict for one monitored unit.

use serde::{Deserialize, Serialize};

/// Immutable result of diagnosing one target unit at one time step.
///
/// `strangeness` is unbounded above zero; `pvalue` and `deviation` are
/// always in `[0, 1]`. A fresh value is produced on every successful
/// predict call; steps with no valid peer comparison yield
/// [`DeviationContext::neutral`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationContext {
    /// Non-conformity score of the unit's sample against its peers.
    pub strangeness: f64,
    /// Conformal p-value: share of reference scores at least as strange.
    pub pvalue: f64,
    /// Normalized martingale deviation level.
    pub deviation: f64,
    /// Whether `deviation` has reached the configured threshold.
    pub is_deviating: bool,
}

impl DeviationContext {
    pub fn new(strangeness: f64, pvalue: f64, deviation: f64, is_deviating: bool) -> Self {
        Self {
            strangeness,
            pvalue,
            deviation,
            is_deviating,
        }
    }

    /// The "no deviation by default" verdict reported when a unit has no
    /// valid comparison baseline for a step.
    pub fn neutral() -> Self {
        Self::new(0.0, 0.5, 0.0, false)
    }

    /// Whether both bounded fields are inside their contractual ranges.
    pub fn in_bounds(&self) -> bool {
        (0.0..=1.0).contains(&self.pvalue) && (0.0..=1.0).contains(&self.deviation)
    }
}
