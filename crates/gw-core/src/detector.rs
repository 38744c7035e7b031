//! Per-unit conformal anomaly detector.
//!
//! `fit` and `predict` are called in strict pairs, once per time step: the
//! peer reference group slides every step, so the strangeness model is
//! refit before every prediction. The p-value uses the smoothed conformal
//! construction with a seeded tie-break so that identical input streams
//! reproduce identical deviation sequences.

use chrono::{DateTime, Utc};
use gw_common::{DeviationContext, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::martingale::DeviationMartingale;
use crate::strangeness::{NonConformity, Strangeness, StrangenessModel};

/// Computational sequences required for correctness, one entry per
/// successful predict call. Append-only, never evicted within a run.
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    pub timestamps: Vec<DateTime<Utc>>,
    pub strangeness: Vec<f64>,
    pub pvalues: Vec<f64>,
    pub deviations: Vec<f64>,
}

/// Diagnostic-only sequences consumed by visualization: the reference
/// representative each sample was compared against and the per-feature
/// difference from it. Kept apart from [`DetectorState`] so consumers can
/// cap or drop them without touching the algorithm's inputs.
#[derive(Debug, Clone, Default)]
pub struct DetectorDiagnostics {
    pub representatives: Vec<Vec<f64>>,
    pub diffs: Vec<Vec<f64>>,
}

/// Deviation detection for a single unit against a sliding reference group.
#[derive(Debug)]
pub struct IndividualAnomalyInductive {
    scorer: Strangeness,
    dev_threshold: f64,
    model: Option<StrangenessModel>,
    martingale: DeviationMartingale,
    rng: StdRng,
    state: DetectorState,
    diagnostics: DetectorDiagnostics,
}

impl IndividualAnomalyInductive {
    pub fn new(
        non_conformity: NonConformity,
        k: usize,
        w_martingale: usize,
        dev_threshold: f64,
        seed: u64,
    ) -> Self {
        Self {
            scorer: Strangeness::new(non_conformity, k),
            dev_threshold,
            model: None,
            martingale: DeviationMartingale::new(w_martingale),
            rng: StdRng::seed_from_u64(seed),
            state: DetectorState::default(),
            diagnostics: DetectorDiagnostics::default(),
        }
    }

    /// Refit the strangeness model to the current reference group,
    /// replacing the previous model. Refitting with an identical reference
    /// set yields an identical model.
    pub fn fit(&mut self, reference: &[Vec<f64>]) -> Result<()> {
        self.model = Some(self.scorer.fit(reference)?);
        Ok(())
    }

    /// Score the sample, derive its conformal p-value, fold it into the
    /// deviation level and record the step.
    pub fn predict(&mut self, dt: DateTime<Utc>, x: &[f64]) -> Result<DeviationContext> {
        let model = self.model.as_ref().ok_or(Error::ModelNotFitted)?;
        let scored = model.score(x)?;

        let theta: f64 = self.rng.random();
        let pvalue = smoothed_pvalue(model.fit_scores(), scored.score, theta);
        let deviation = self.martingale.update(pvalue);
        let is_deviating = deviation >= self.dev_threshold;

        self.state.timestamps.push(dt);
        self.state.strangeness.push(scored.score);
        self.state.pvalues.push(pvalue);
        self.state.deviations.push(deviation);
        self.diagnostics.representatives.push(scored.representative);
        self.diagnostics.diffs.push(scored.diff);

        Ok(DeviationContext::new(
            scored.score,
            pvalue,
            deviation,
            is_deviating,
        ))
    }

    /// Whether a model is currently fitted.
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn dev_threshold(&self) -> f64 {
        self.dev_threshold
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn diagnostics(&self) -> &DetectorDiagnostics {
        &self.diagnostics
    }
}

/// Smoothed conformal p-value of a score against the calibration scores:
/// `(#{s_i > s} + theta * (#{s_i = s} + 1)) / (n + 1)` with
/// `theta` uniform on [0, 1), so null p-values are uniform on [0, 1].
pub fn smoothed_pvalue(calibration: &[f64], score: f64, theta: f64) -> f64 {
    let greater = calibration.iter().filter(|&&s| s > score).count();
    let equal = calibration.iter().filter(|&&s| s == score).count();
    (greater as f64 + theta * (equal as f64 + 1.0)) / (calibration.len() as f64 + 1.0)
}
