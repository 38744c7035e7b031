//! Peer reference group assembly.
//!
//! For a target unit at timestamp `dt`, the comparison baseline is every
//! sample from every *other* unit whose timestamp falls inside the trailing
//! window `[dt - w_ref_group, dt)`: closed at the start so boundary ties
//! are included, open at the end so the step being diagnosed never supplies
//! its own peers. The window is a duration, not a sample count: reference
//! size varies with data density.

use chrono::{DateTime, Duration, Utc};
use gw_common::{Error, Result, UnitId};

use crate::history::TimeSeries;

/// Assembles (target sample, reference group) pairs from the fleet's
/// transformed histories.
#[derive(Debug, Clone)]
pub struct PeerGrouping {
    w_ref_group: Duration,
}

impl PeerGrouping {
    pub fn new(w_ref_group: Duration) -> Self {
        Self { w_ref_group }
    }

    pub fn w_ref_group(&self) -> Duration {
        self.w_ref_group
    }

    /// The target unit's sample at exactly `dt`, and the flattened peer
    /// samples within the trailing window.
    ///
    /// Fails with `MissingTargetSample` if the target has no sample at
    /// `dt`, `EmptyReferenceGroup` if no peer data falls in the window,
    /// and `UnknownUnit` if `unit` does not address a history.
    pub fn target_and_reference(
        &self,
        unit: UnitId,
        dt: DateTime<Utc>,
        histories: &[TimeSeries],
    ) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
        if !unit.in_range(histories.len()) {
            return Err(Error::UnknownUnit {
                unit,
                nb_units: histories.len(),
            });
        }

        let x = histories[unit.index()]
            .sample_at(dt)
            .ok_or(Error::MissingTargetSample { unit, at: dt })?
            .to_vec();

        let from = dt - self.w_ref_group;
        let mut reference = Vec::new();
        for (i, history) in histories.iter().enumerate() {
            if i == unit.index() {
                continue;
            }
            reference.extend_from_slice(history.window(from, dt));
        }

        if reference.is_empty() {
            return Err(Error::EmptyReferenceGroup { unit, at: dt });
        }

        Ok((x, reference))
    }
}
