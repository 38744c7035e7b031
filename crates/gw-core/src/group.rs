//! Fleet-level orchestration: one detector per unit, one shared peer
//! grouping, one call per time step.
//!
//! `step` is strictly sequential: it ingests one timestamp for the whole
//! fleet, refreshes every unit's transformed history, then diagnoses each
//! target unit in configured order. Calls must arrive in non-decreasing
//! timestamp order; peer grouping and the martingale both depend on it.

use chrono::{DateTime, Utc};
use gw_common::{DeviationContext, Error, Result, UnitId};

use crate::config::GroupConfig;
use crate::detector::{DetectorDiagnostics, DetectorState, IndividualAnomalyInductive};
use crate::grouping::PeerGrouping;
use crate::history::TimeSeries;
use crate::transform::Transformer;

/// Group-based anomaly monitor for a fleet of units.
///
/// Owns the raw and transformed history, the transformer and the detector
/// of every unit. Units never mutate each other's state; peer grouping
/// reads the other units' transformed histories immutably.
#[derive(Debug)]
pub struct GroupAnomaly {
    config: GroupConfig,
    grouping: PeerGrouping,
    raw: Vec<TimeSeries>,
    transformed: Vec<TimeSeries>,
    transformers: Vec<Transformer>,
    detectors: Vec<IndividualAnomalyInductive>,
}

impl GroupAnomaly {
    /// Build a monitor from a validated configuration.
    pub fn new(config: GroupConfig) -> Result<Self> {
        config.validate().map_err(Error::from)?;

        let raw = (0..config.nb_units).map(|_| TimeSeries::new()).collect();
        let transformed = (0..config.nb_units).map(|_| TimeSeries::new()).collect();
        let transformers = (0..config.nb_units)
            .map(|_| Transformer::new(config.transformer, config.w_transform))
            .collect();
        // Each unit derives its own tie-break stream from the fleet seed.
        let detectors = (0..config.nb_units)
            .map(|uid| {
                IndividualAnomalyInductive::new(
                    config.non_conformity,
                    config.k,
                    config.w_martingale,
                    config.dev_threshold,
                    config.seed.wrapping_add(uid as u64),
                )
            })
            .collect();

        Ok(Self {
            grouping: PeerGrouping::new(config.w_ref_group),
            raw,
            transformed,
            transformers,
            detectors,
            config,
        })
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Ingest one sample per unit at timestamp `dt` and diagnose every
    /// target unit, in target-list order.
    ///
    /// Per-step data gaps (missing target sample, empty reference group,
    /// insufficient reference) yield the neutral context for that unit.
    /// Contract violations (wrong sample count, wrong dimensionality)
    /// propagate and leave no partial diagnosis.
    pub fn step(
        &mut self,
        dt: DateTime<Utc>,
        x_units: &[Vec<f64>],
    ) -> Result<Vec<DeviationContext>> {
        if x_units.len() != self.config.nb_units {
            return Err(Error::UnitCountMismatch {
                expected: self.config.nb_units,
                got: x_units.len(),
            });
        }

        for (i, x) in x_units.iter().enumerate() {
            self.raw[i].push(dt, x.clone())?;
            let transformed = self.transformers[i].transform(x)?;
            self.transformed[i].push(dt, transformed)?;
        }

        let targets = self.config.ids_target_units.clone();
        let mut deviations = Vec::with_capacity(targets.len());
        for unit in targets {
            deviations.push(self.diagnose(unit, dt)?);
        }
        Ok(deviations)
    }

    fn diagnose(&mut self, unit: UnitId, dt: DateTime<Utc>) -> Result<DeviationContext> {
        let outcome = self
            .grouping
            .target_and_reference(unit, dt, &self.transformed)
            .and_then(|(x, reference)| {
                let detector = &mut self.detectors[unit.index()];
                detector.fit(&reference)?;
                detector.predict(dt, &x)
            });

        match outcome {
            Ok(ctx) => Ok(ctx),
            Err(err) if err.is_recoverable() => {
                tracing::debug!(
                    unit = unit.index(),
                    at = %dt,
                    error = %err,
                    "no valid peer comparison this step, reporting neutral"
                );
                Ok(DeviationContext::neutral())
            }
            Err(err) => Err(err),
        }
    }

    /// Raw history of one unit, for display consumers.
    pub fn raw_history(&self, unit: UnitId) -> Result<&TimeSeries> {
        self.check_unit(unit)?;
        Ok(&self.raw[unit.index()])
    }

    /// Transformed history of one unit, for display consumers.
    pub fn transformed_history(&self, unit: UnitId) -> Result<&TimeSeries> {
        self.check_unit(unit)?;
        Ok(&self.transformed[unit.index()])
    }

    /// Computational detector sequences (T, S, P, M) of one unit.
    pub fn detector_state(&self, unit: UnitId) -> Result<&DetectorState> {
        self.check_unit(unit)?;
        Ok(self.detectors[unit.index()].state())
    }

    /// Diagnostic sequences (representatives, diffs) of one unit.
    pub fn detector_diagnostics(&self, unit: UnitId) -> Result<&DetectorDiagnostics> {
        self.check_unit(unit)?;
        Ok(self.detectors[unit.index()].diagnostics())
    }

    fn check_unit(&self, unit: UnitId) -> Result<()> {
        if unit.in_range(self.config.nb_units) {
            Ok(())
        } else {
            Err(Error::UnknownUnit {
                unit,
                nb_units: self.config.nb_units,
            })
        }
    }
}
