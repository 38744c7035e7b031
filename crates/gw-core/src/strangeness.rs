//! Strangeness (non-conformity) measures against a peer reference group.
//!
//! A [`Strangeness`] factory fits a [`StrangenessModel`] to the current
//! reference group; the model then scores incoming samples, larger meaning
//! more non-conforming. Fitting also scores every reference sample against
//! the fitted model (leave-one-out for the neighbor-based measures), which
//! gives the calibration distribution the conformal p-value is computed
//! from.
//!
//! Measures:
//! - `median`: Euclidean distance to the coordinate-wise median of the
//!   reference group.
//! - `knn`: mean Euclidean distance to the `k` nearest reference samples.
//! - `lof`: local outlier factor (density ratio) relative to the reference
//!   group.
//!
//! `k` larger than the reference size is clamped to it at fit time; a
//! statically invalid `k == 0` is rejected at configuration validation.

use gw_common::{Error, Result};
use gw_math::{coordinate_mean, coordinate_median, euclidean, sub};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floor for local reachability densities so density ratios stay finite.
const MIN_MEAN_REACH: f64 = 1e-12;

/// Strangeness measure selected at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonConformity {
    #[default]
    Median,
    Knn,
    Lof,
}

impl fmt::Display for NonConformity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonConformity::Median => write!(f, "median"),
            NonConformity::Knn => write!(f, "knn"),
            NonConformity::Lof => write!(f, "lof"),
        }
    }
}

/// Strangeness scorer factory: policy plus its neighbor parameter.
#[derive(Debug, Clone)]
pub struct Strangeness {
    policy: NonConformity,
    k: usize,
}

/// One scored sample: the score plus the diagnostics the visualization
/// consumer reads (the reference representative the sample was compared
/// against, and the per-feature difference from it).
#[derive(Debug, Clone)]
pub struct Scored {
    pub score: f64,
    pub representative: Vec<f64>,
    pub diff: Vec<f64>,
}

/// Fitted state capturing "what is normal" for one reference group.
#[derive(Debug, Clone)]
pub struct StrangenessModel {
    width: usize,
    fit_scores: Vec<f64>,
    fitted: Fitted,
}

#[derive(Debug, Clone)]
enum Fitted {
    Median {
        center: Vec<f64>,
    },
    Knn {
        reference: Vec<Vec<f64>>,
        k: usize,
    },
    Lof {
        reference: Vec<Vec<f64>>,
        k: usize,
        /// Distance from each reference sample to its k-th neighbor.
        k_distances: Vec<f64>,
        /// Local reachability density of each reference sample.
        lrd: Vec<f64>,
        center: Vec<f64>,
    },
}

impl Strangeness {
    pub fn new(policy: NonConformity, k: usize) -> Self {
        Self { policy, k }
    }

    pub fn policy(&self) -> NonConformity {
        self.policy
    }

    /// Fit a model to the reference group.
    ///
    /// Fails with `InsufficientReference` on an empty group and with
    /// `DimensionMismatch` if the reference samples disagree on width.
    pub fn fit(&self, reference: &[Vec<f64>]) -> Result<StrangenessModel> {
        let Some(first) = reference.first() else {
            return Err(Error::InsufficientReference { have: 0, needed: 1 });
        };
        let width = first.len();
        if let Some(bad) = reference.iter().find(|s| s.len() != width) {
            return Err(Error::DimensionMismatch {
                expected: width,
                got: bad.len(),
            });
        }

        let n = reference.len();
        if matches!(self.policy, NonConformity::Knn | NonConformity::Lof) && self.k > n {
            tracing::debug!(
                k = self.k,
                available = n,
                policy = %self.policy,
                "clamping neighbor count to reference size"
            );
        }

        let (fitted, fit_scores) = match self.policy {
            NonConformity::Median => {
                let center = coordinate_median(reference);
                let scores = reference.iter().map(|s| euclidean(s, &center)).collect();
                (Fitted::Median { center }, scores)
            }
            NonConformity::Knn => {
                let k = self.k.min(n);
                let scores = knn_fit_scores(reference, self.k);
                (
                    Fitted::Knn {
                        reference: reference.to_vec(),
                        k,
                    },
                    scores,
                )
            }
            NonConformity::Lof => {
                let k = self.k.min(n);
                let (k_distances, lrd, scores) = lof_fit(reference, self.k);
                (
                    Fitted::Lof {
                        reference: reference.to_vec(),
                        k,
                        k_distances,
                        lrd,
                        center: coordinate_median(reference),
                    },
                    scores,
                )
            }
        };

        Ok(StrangenessModel {
            width,
            fit_scores,
            fitted,
        })
    }
}

impl StrangenessModel {
    /// Feature width the model was fitted with.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Strangeness of each reference sample under this model, the
    /// calibration distribution for conformal p-values.
    pub fn fit_scores(&self) -> &[f64] {
        &self.fit_scores
    }

    /// Score a sample against the fitted reference group.
    pub fn score(&self, x: &[f64]) -> Result<Scored> {
        if x.len() != self.width {
            return Err(Error::DimensionMismatch {
                expected: self.width,
                got: x.len(),
            });
        }

        let scored = match &self.fitted {
            Fitted::Median { center } => Scored {
                score: euclidean(x, center),
                representative: center.clone(),
                diff: sub(x, center),
            },
            Fitted::Knn { reference, k } => {
                let nearest = nearest_neighbors(reference, x, *k);
                let score = mean(nearest.iter().map(|&(_, d)| d));
                let picked: Vec<Vec<f64>> = nearest
                    .iter()
                    .map(|&(i, _)| reference[i].clone())
                    .collect();
                let representative = coordinate_mean(&picked);
                let diff = sub(x, &representative);
                Scored {
                    score,
                    representative,
                    diff,
                }
            }
            Fitted::Lof {
                reference,
                k,
                k_distances,
                lrd,
                center,
            } => {
                let nearest = nearest_neighbors(reference, x, *k);
                let score = if nearest.is_empty() {
                    0.0
                } else {
                    let mean_reach = mean(
                        nearest
                            .iter()
                            .map(|&(j, d)| d.max(k_distances[j])),
                    );
                    let lrd_x = 1.0 / mean_reach.max(MIN_MEAN_REACH);
                    let mean_neighbor_lrd = mean(nearest.iter().map(|&(j, _)| lrd[j]));
                    mean_neighbor_lrd / lrd_x
                };
                Scored {
                    score,
                    representative: center.clone(),
                    diff: sub(x, center),
                }
            }
        };

        Ok(scored)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Indices and distances of the `k` reference samples nearest to `x`,
/// nearest first. `k` is clamped to the reference size.
fn nearest_neighbors(reference: &[Vec<f64>], x: &[f64], k: usize) -> Vec<(usize, f64)> {
    let mut distances: Vec<(usize, f64)> = reference
        .iter()
        .enumerate()
        .map(|(i, s)| (i, euclidean(x, s)))
        .collect();
    distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    distances.truncate(k.min(reference.len()));
    distances
}

/// Leave-one-out knn scores of the reference samples themselves.
fn knn_fit_scores(reference: &[Vec<f64>], k: usize) -> Vec<f64> {
    let n = reference.len();
    (0..n)
        .map(|i| {
            let mut distances: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .map(|j| euclidean(&reference[i], &reference[j]))
                .collect();
            distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            distances.truncate(k.min(n.saturating_sub(1)));
            mean(distances.into_iter())
        })
        .collect()
}

/// LOF fit: k-distances, local reachability densities, and the LOF of each
/// reference sample (the calibration scores).
fn lof_fit(reference: &[Vec<f64>], k: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = reference.len();
    let k_eff = k.min(n.saturating_sub(1));
    if k_eff == 0 {
        // A single reference sample has no neighborhood to compare against.
        return (vec![0.0; n], vec![1.0 / MIN_MEAN_REACH; n], vec![0.0; n]);
    }

    let neighbors: Vec<Vec<(usize, f64)>> = (0..n)
        .map(|i| {
            let mut distances: Vec<(usize, f64)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (j, euclidean(&reference[i], &reference[j])))
                .collect();
            distances
                .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            distances.truncate(k_eff);
            distances
        })
        .collect();

    let k_distances: Vec<f64> = neighbors
        .iter()
        .map(|nbrs| nbrs.last().map(|&(_, d)| d).unwrap_or(0.0))
        .collect();

    let lrd: Vec<f64> = (0..n)
        .map(|i| {
            let mean_reach = mean(
                neighbors[i]
                    .iter()
                    .map(|&(j, d)| d.max(k_distances[j])),
            );
            1.0 / mean_reach.max(MIN_MEAN_REACH)
        })
        .collect();

    let scores: Vec<f64> = (0..n)
        .map(|i| mean(neighbors[i].iter().map(|&(j, _)| lrd[j])) / lrd[i])
        .collect();

    (k_distances, lrd, scores)
}
