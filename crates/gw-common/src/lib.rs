//! Groupwatch shared types: unit identity, the deviation context value
//! returned per monitored unit, and the unified error taxonomy.

pub mod context;
pub mod error;
pub mod id;

pub use context::DeviationContext;
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::UnitId;
