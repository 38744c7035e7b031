//! Property-based tests for gw-math primitives.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use gw_math::{coordinate_median, euclidean, median, rank_fraction, sub};
use proptest::prelude::*;

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-9;

fn vec_strategy(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1e6..1e6f64, len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Euclidean distance is symmetric.
    #[test]
    fn euclidean_symmetric(a in vec_strategy(4), b in vec_strategy(4)) {
        let ab = euclidean(&a, &b);
        let ba = euclidean(&b, &a);
        prop_assert!((ab - ba).abs() <= TOL, "d(a,b)={} != d(b,a)={}", ab, ba);
    }

    /// Distance to self is zero, and distances are never negative.
    #[test]
    fn euclidean_identity_nonneg(a in vec_strategy(4), b in vec_strategy(4)) {
        prop_assert!(euclidean(&a, &a).abs() <= TOL);
        prop_assert!(euclidean(&a, &b) >= 0.0);
    }

    /// Triangle inequality.
    #[test]
    fn euclidean_triangle(a in vec_strategy(3), b in vec_strategy(3), c in vec_strategy(3)) {
        let ac = euclidean(&a, &c);
        let detour = euclidean(&a, &b) + euclidean(&b, &c);
        prop_assert!(ac <= detour + TOL * (1.0 + detour.abs()),
            "d(a,c)={} > d(a,b)+d(b,c)={}", ac, detour);
    }

    /// The median lies between the extremes of its input.
    #[test]
    fn median_bounded(values in prop::collection::vec(-1e6..1e6f64, 1..32)) {
        let m = median(&values);
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(m >= lo - TOL && m <= hi + TOL, "median {} outside [{}, {}]", m, lo, hi);
    }

    /// Median is invariant under permutation.
    #[test]
    fn median_permutation_invariant(mut values in prop::collection::vec(-1e6..1e6f64, 1..16)) {
        let before = median(&values);
        values.reverse();
        let after = median(&values);
        prop_assert!((before - after).abs() <= TOL);
    }

    /// Rank fractions always lie strictly inside (0, 1).
    #[test]
    fn rank_fraction_in_open_unit_interval(
        values in prop::collection::vec(-1e6..1e6f64, 0..32),
        x in -1e6..1e6f64,
    ) {
        let r = rank_fraction(&values, x);
        prop_assert!(r > 0.0 && r < 1.0, "rank_fraction {} outside (0,1)", r);
    }

    /// Rank fraction is antitone in x: larger values rank as less extreme.
    #[test]
    fn rank_fraction_antitone(
        values in prop::collection::vec(-1e3..1e3f64, 1..16),
        x in -1e3..1e3f64,
        bump in 0.001..1e3f64,
    ) {
        let at_x = rank_fraction(&values, x);
        let above = rank_fraction(&values, x + bump);
        prop_assert!(above <= at_x + TOL, "rank({})={} > rank({})={}", x + bump, above, x, at_x);
    }

    /// Coordinate-wise median of identical rows is that row.
    #[test]
    fn coordinate_median_of_copies(row in vec_strategy(3), n in 1usize..8) {
        let samples = vec![row.clone(); n];
        let m = coordinate_median(&samples);
        for (got, want) in m.iter().zip(row.iter()) {
            prop_assert!((got - want).abs() <= TOL);
        }
    }

    /// sub is the inverse of element-wise addition.
    #[test]
    fn sub_roundtrip(a in vec_strategy(4), b in vec_strategy(4)) {
        let d = sub(&a, &b);
        for i in 0..4 {
            prop_assert!((d[i] + b[i] - a[i]).abs() <= TOL * (1.0 + a[i].abs()));
        }
    }
}
