//! Groupwatch Core Library
//!
//! Online, group-based anomaly detection for a fleet of monitored units
//! observed synchronously over time:
//! - Per-unit trailing-window transformation into a comparable space
//! - Peer-group assembly over a trailing time window
//! - Conformal strangeness scoring against the peer reference group
//! - Martingale aggregation of p-values into a bounded deviation level
//!
//! The entry point is [`group::GroupAnomaly`]: feed it one sample per unit
//! per time step and read back a [`gw_common::DeviationContext`] per target
//! unit. Timestamps must arrive in non-decreasing order; behavior on
//! out-of-order input is undefined.

pub mod config;
pub mod detector;
pub mod group;
pub mod grouping;
pub mod history;
pub mod logging;
pub mod martingale;
pub mod strangeness;
pub mod transform;

pub use config::GroupConfig;
pub use detector::IndividualAnomalyInductive;
pub use group::GroupAnomaly;
pub use gw_common::{DeviationContext, Error, Result, UnitId};
