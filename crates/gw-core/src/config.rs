//! Fleet configuration and semantic validation.
//!
//! [`GroupConfig`] is constructed in-process (no file surface) and checked
//! once by [`GroupConfig::validate`] before any detector state exists.
//! Violations are construction-time errors; the engine never re-validates
//! per step.

use chrono::Duration;
use gw_common::{Error, UnitId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strangeness::NonConformity;
use crate::transform::Transform;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("nb_units must be positive, got {0}")]
    InvalidUnitCount(usize),

    #[error("target {unit} is out of range for a fleet of {nb_units} units")]
    TargetOutOfRange { unit: UnitId, nb_units: usize },

    #[error("target {0} is listed more than once")]
    DuplicateTarget(UnitId),

    #[error("{field} must be positive")]
    NonPositiveWindow { field: &'static str },

    #[error("dev_threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("k must be at least 1 for {policy} non-conformity, got {k}")]
    InvalidNeighborCount { policy: NonConformity, k: usize },
}

impl ConfigError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::InvalidUnitCount(_) => 10,
            ConfigError::TargetOutOfRange { .. } => 11,
            ConfigError::DuplicateTarget(_) => 12,
            ConfigError::NonPositiveWindow { .. } => 13,
            ConfigError::InvalidThreshold(_) => 14,
            ConfigError::InvalidNeighborCount { .. } => 15,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Configuration for a [`crate::group::GroupAnomaly`] fleet monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Number of monitored units. Must equal the length of each step's
    /// sample slice.
    pub nb_units: usize,

    /// Units to diagnose, in reporting order.
    pub ids_target_units: Vec<UnitId>,

    /// Trailing time window defining the peer reference group.
    #[serde(with = "duration_secs", default = "default_w_ref_group")]
    pub w_ref_group: Duration,

    /// Number of trailing steps used to normalize the deviation level.
    #[serde(default = "default_w_martingale")]
    pub w_martingale: usize,

    /// Strangeness measure used against the reference group.
    #[serde(default)]
    pub non_conformity: NonConformity,

    /// Neighbor count for the knn and lof measures.
    #[serde(default = "default_k")]
    pub k: usize,

    /// Threshold in [0, 1] on the deviation level.
    #[serde(default = "default_dev_threshold")]
    pub dev_threshold: f64,

    /// Per-unit preprocessing applied before peer comparison.
    #[serde(default)]
    pub transformer: Transform,

    /// Trailing window size for the per-unit transformer.
    #[serde(default = "default_w_transform")]
    pub w_transform: usize,

    /// Seed for the conformal tie-break randomization. Each unit draws
    /// from its own stream derived from this seed, so identical input
    /// streams reproduce identical deviation sequences.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_w_ref_group() -> Duration {
    Duration::days(7)
}

fn default_w_martingale() -> usize {
    15
}

fn default_k() -> usize {
    20
}

fn default_dev_threshold() -> f64 {
    0.6
}

fn default_w_transform() -> usize {
    30
}

fn default_seed() -> u64 {
    42
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            nb_units: 1,
            ids_target_units: vec![UnitId(0)],
            w_ref_group: default_w_ref_group(),
            w_martingale: default_w_martingale(),
            non_conformity: NonConformity::default(),
            k: default_k(),
            dev_threshold: default_dev_threshold(),
            transformer: Transform::default(),
            w_transform: default_w_transform(),
            seed: default_seed(),
        }
    }
}

impl GroupConfig {
    /// Validate the configuration semantically.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nb_units == 0 {
            return Err(ConfigError::InvalidUnitCount(self.nb_units));
        }
        for (i, unit) in self.ids_target_units.iter().enumerate() {
            if !unit.in_range(self.nb_units) {
                return Err(ConfigError::TargetOutOfRange {
                    unit: *unit,
                    nb_units: self.nb_units,
                });
            }
            if self.ids_target_units[..i].contains(unit) {
                return Err(ConfigError::DuplicateTarget(*unit));
            }
        }
        if self.w_ref_group <= Duration::zero() {
            return Err(ConfigError::NonPositiveWindow {
                field: "w_ref_group",
            });
        }
        if self.w_martingale == 0 {
            return Err(ConfigError::NonPositiveWindow {
                field: "w_martingale",
            });
        }
        if self.w_transform == 0 {
            return Err(ConfigError::NonPositiveWindow {
                field: "w_transform",
            });
        }
        if !(0.0..=1.0).contains(&self.dev_threshold) {
            return Err(ConfigError::InvalidThreshold(self.dev_threshold));
        }
        if matches!(self.non_conformity, NonConformity::Knn | NonConformity::Lof) && self.k == 0 {
            return Err(ConfigError::InvalidNeighborCount {
                policy: self.non_conformity,
                k: self.k,
            });
        }
        Ok(())
    }
}

/// Serde adapter storing the reference window as whole seconds.
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Ok(Duration::seconds(secs))
    }
}
