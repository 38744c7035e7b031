//! Append-only per-unit time series.
//!
//! One `TimeSeries` holds either the raw or the transformed history of a
//! single unit. Timestamps are supplied by the caller in non-decreasing
//! order (precondition, not enforced); window queries rely on it.

use chrono::{DateTime, Utc};
use gw_common::{Error, Result};

/// Ordered (timestamp, sample) history with a pinned feature width.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    width: Option<usize>,
    times: Vec<DateTime<Utc>>,
    values: Vec<Vec<f64>>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Feature width, pinned by the first accepted sample.
    pub fn width(&self) -> Option<usize> {
        self.width
    }

    /// Recorded timestamps, ascending.
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// Recorded samples, in timestamp order.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Append one sample. The first append pins the width; later appends
    /// must match it.
    pub fn push(&mut self, dt: DateTime<Utc>, sample: Vec<f64>) -> Result<()> {
        match self.width {
            None => self.width = Some(sample.len()),
            Some(width) if width != sample.len() => {
                return Err(Error::DimensionMismatch {
                    expected: width,
                    got: sample.len(),
                });
            }
            Some(_) => {}
        }
        self.times.push(dt);
        self.values.push(sample);
        Ok(())
    }

    /// Sample recorded exactly at `dt`, searched from the tail (the common
    /// case is the sample appended this step).
    pub fn sample_at(&self, dt: DateTime<Utc>) -> Option<&[f64]> {
        self.times
            .iter()
            .rposition(|&t| t == dt)
            .map(|i| self.values[i].as_slice())
    }

    /// Samples with timestamps in `[from, until)`: closed at the window
    /// start so boundary ties are included, open at the end so samples at
    /// the in-flight timestamp are excluded.
    pub fn window(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> &[Vec<f64>] {
        let start = self.times.partition_point(|&t| t < from);
        let end = self.times.partition_point(|&t| t < until);
        &self.values[start..end]
    }
}
