//! Additive martingale deviation level.
//!
//! Converts a stream of conformal p-values into a bounded deviation signal.
//! Each update bets `0.5 - p` against the null hypothesis: systematically
//! small p-values grow the cumulative sum, uniform p-values cancel out. The
//! deviation level is the cumulative gain over the trailing `w_martingale`
//! steps, normalized by the maximum attainable gain `0.5 * w` and clamped
//! one-sided into `[0, 1]`.
//!
//! This is the additive formulation rather than a multiplicative power
//! martingale: the trailing-window normalization is what bounds the output,
//! and decay back to zero after an anomaly ends is governed by the window
//! length rather than by a betting exponent.

/// Running deviation level over a stream of p-values.
#[derive(Debug, Clone)]
pub struct DeviationMartingale {
    w_martingale: usize,
    cumulative: f64,
    /// Cumulative sums after each update, seeded with the starting zero.
    history: Vec<f64>,
}

impl DeviationMartingale {
    pub fn new(w_martingale: usize) -> Self {
        Self {
            w_martingale,
            cumulative: 0.0,
            history: vec![0.0],
        }
    }

    /// Number of p-values folded in so far.
    pub fn len(&self) -> usize {
        self.history.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold in one p-value and return the updated deviation level.
    pub fn update(&mut self, pvalue: f64) -> f64 {
        self.cumulative += 0.5 - pvalue;
        self.history.push(self.cumulative);

        let w = self.w_martingale.min(self.history.len());
        let windowed = self.cumulative - self.history[self.history.len() - w];
        (windowed / (0.5 * w as f64)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_pvalues_stay_low() {
        let mut mart = DeviationMartingale::new(10);
        for _ in 0..50 {
            let dev = mart.update(0.5);
            assert_eq!(dev, 0.0);
        }
    }

    #[test]
    fn test_small_pvalues_grow_deviation() {
        let mut mart = DeviationMartingale::new(10);
        let mut last = 0.0;
        for _ in 0..10 {
            last = mart.update(0.01);
        }
        assert!(last > 0.8, "sustained small p-values should saturate, got {}", last);
    }

    #[test]
    fn test_large_pvalues_decay_deviation() {
        let mut mart = DeviationMartingale::new(5);
        for _ in 0..10 {
            mart.update(0.01);
        }
        let dev = (0..10).map(|_| mart.update(0.99)).last().unwrap();
        assert_eq!(dev, 0.0);
    }

    #[test]
    fn test_deviation_always_in_unit_interval() {
        let mut mart = DeviationMartingale::new(7);
        let pvalues = [0.0, 0.0, 1.0, 0.2, 0.9, 0.0, 0.5, 1.0, 0.0, 0.0, 0.0];
        for (i, &p) in pvalues.iter().cycle().take(200).enumerate() {
            let dev = mart.update(p);
            assert!((0.0..=1.0).contains(&dev), "step {}: deviation {}", i, dev);
        }
    }

    #[test]
    fn test_window_bounds_lookback() {
        // One old anomalous burst must leave the window entirely.
        let mut mart = DeviationMartingale::new(3);
        for _ in 0..5 {
            mart.update(0.0);
        }
        let dev = (0..3).map(|_| mart.update(0.5)).last().unwrap();
        assert_eq!(dev, 0.0);
    }

    #[test]
    fn test_len_counts_updates() {
        let mut mart = DeviationMartingale::new(4);
        assert!(mart.is_empty());
        mart.update(0.3);
        mart.update(0.7);
        assert_eq!(mart.len(), 2);
    }
}
