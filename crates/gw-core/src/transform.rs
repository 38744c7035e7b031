//! Per-unit preprocessing into a comparable feature space.
//!
//! Units in a fleet rarely share a baseline: the same load pattern sits at
//! different absolute levels per unit. The transformer maps each raw sample
//! through a trailing window of the unit's own recent history so that units
//! become directly comparable. Must be called exactly once per incoming
//! sample, in arrival order.

use gw_common::{Error, Result};
use gw_math::rank_fraction;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Transformation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Identity pass-through.
    None,
    /// Per-feature rank of the incoming value within the unit's trailing
    /// window, mapped into (0, 1) with half weight on ties.
    #[default]
    Pvalue,
}

/// Stateful per-unit transformer over a trailing window of raw samples.
#[derive(Debug, Clone)]
pub struct Transformer {
    policy: Transform,
    w_transform: usize,
    width: Option<usize>,
    window: VecDeque<Vec<f64>>,
}

impl Transformer {
    pub fn new(policy: Transform, w_transform: usize) -> Self {
        Self {
            policy,
            w_transform,
            width: None,
            window: VecDeque::with_capacity(w_transform),
        }
    }

    /// Number of raw samples currently in the trailing window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Map one raw sample into the comparable space.
    ///
    /// The sample is ranked against the window of *previous* samples, then
    /// appended to the window. Width is pinned by the first sample.
    pub fn transform(&mut self, x: &[f64]) -> Result<Vec<f64>> {
        match self.width {
            None => self.width = Some(x.len()),
            Some(width) if width != x.len() => {
                return Err(Error::DimensionMismatch {
                    expected: width,
                    got: x.len(),
                });
            }
            Some(_) => {}
        }

        let out = match self.policy {
            Transform::None => x.to_vec(),
            Transform::Pvalue => {
                let mut column = Vec::with_capacity(self.window.len());
                (0..x.len())
                    .map(|j| {
                        column.clear();
                        column.extend(self.window.iter().map(|s| s[j]));
                        rank_fraction(&column, x[j])
                    })
                    .collect()
            }
        };

        self.window.push_back(x.to_vec());
        if self.window.len() > self.w_transform {
            self.window.pop_front();
        }

        Ok(out)
    }
}
