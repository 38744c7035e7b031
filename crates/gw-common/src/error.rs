//! Error types for Groupwatch.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers
//!
//! Recoverable errors are per-step data gaps: the orchestrator maps them to
//! the neutral [`crate::DeviationContext`] and continues. Non-recoverable
//! errors are caller contract violations (wrong sample count, wrong
//! dimensionality) and must propagate.
//!
//! Errors serialize to structured JSON for agent consumers:
//! ```json
//! {
//!   "code": 21,
//!   "category": "grouping",
//!   "message": "unit-2 has no peer samples in the reference window ending at ...",
//!   "recoverable": true,
//!   "context": { "unit": 2 }
//! }
//! ```

use crate::id::UnitId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Groupwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Construction-time configuration errors.
    Config,
    /// Peer-group assembly errors (per-step data gaps).
    Grouping,
    /// Strangeness scoring errors.
    Scoring,
    /// Caller contract violations.
    Contract,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Grouping => write!(f, "grouping"),
            ErrorCategory::Scoring => write!(f, "scoring"),
            ErrorCategory::Contract => write!(f, "contract"),
        }
    }
}

/// Unified error type for Groupwatch.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Grouping errors (20-29)
    #[error("{unit} has no sample at {at}")]
    MissingTargetSample { unit: UnitId, at: DateTime<Utc> },

    #[error("{unit} has no peer samples in the reference window ending at {at}")]
    EmptyReferenceGroup { unit: UnitId, at: DateTime<Utc> },

    // Scoring errors (30-39)
    #[error("insufficient reference samples: have {have}, need at least {needed}")]
    InsufficientReference { have: usize, needed: usize },

    // Contract violations (40-49)
    #[error("dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("sample count mismatch: expected {expected} units, got {got}")]
    UnitCountMismatch { expected: usize, got: usize },

    #[error("{unit} is out of range for a fleet of {nb_units} units")]
    UnknownUnit { unit: UnitId, nb_units: usize },

    #[error("predict called before fit: no strangeness model available")]
    ModelNotFitted,
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Error codes are grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Grouping errors
    /// - 30-39: Scoring errors
    /// - 40-49: Contract violations
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MissingTargetSample { .. } => 20,
            Error::EmptyReferenceGroup { .. } => 21,
            Error::InsufficientReference { .. } => 30,
            Error::DimensionMismatch { .. } => 40,
            Error::UnitCountMismatch { .. } => 41,
            Error::UnknownUnit { .. } => 42,
            Error::ModelNotFitted => 43,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,

            Error::MissingTargetSample { .. } | Error::EmptyReferenceGroup { .. } => {
                ErrorCategory::Grouping
            }

            Error::InsufficientReference { .. } => ErrorCategory::Scoring,

            Error::DimensionMismatch { .. }
            | Error::UnitCountMismatch { .. }
            | Error::UnknownUnit { .. }
            | Error::ModelNotFitted => ErrorCategory::Contract,
        }
    }

    /// Returns whether the step that produced this error may continue with
    /// the neutral deviation context.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Config: recoverable by fixing the configuration
            Error::Config(_) => true,

            // Grouping: per-step data gaps, neutral default applies
            Error::MissingTargetSample { .. } => true,
            Error::EmptyReferenceGroup { .. } => true,

            // Scoring: fatal to this step only
            Error::InsufficientReference { .. } => true,

            // Contract violations must propagate
            Error::DimensionMismatch { .. } => false,
            Error::UnitCountMismatch { .. } => false,
            Error::UnknownUnit { .. } => false,
            Error::ModelNotFitted => false,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the step may continue with the neutral context.
    pub recoverable: bool,

    /// Additional structured context (e.g., unit id, timestamp).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MissingTargetSample { unit, at } | Error::EmptyReferenceGroup { unit, at } => {
                context.insert("unit".to_string(), serde_json::json!(unit.0));
                context.insert("at".to_string(), serde_json::json!(at.to_rfc3339()));
            }
            Error::InsufficientReference { have, needed } => {
                context.insert("have".to_string(), serde_json::json!(have));
                context.insert("needed".to_string(), serde_json::json!(needed));
            }
            Error::DimensionMismatch { expected, got } => {
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("got".to_string(), serde_json::json!(got));
            }
            Error::UnitCountMismatch { expected, got } => {
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("got".to_string(), serde_json::json!(got));
            }
            Error::UnknownUnit { unit, nb_units } => {
                context.insert("unit".to_string(), serde_json::json!(unit.0));
                context.insert("nb_units".to_string(), serde_json::json!(nb_units));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
