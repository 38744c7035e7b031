//! Groupwatch math utilities.

pub mod math;

pub use math::stats::*;
