//! Integration scenarios for the fleet monitor: conforming fleets stay
//! quiet, a shifted unit is flagged within the martingale window, data
//! gaps degrade to the neutral verdict.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gw_common::{DeviationContext, UnitId};
use gw_core::config::GroupConfig;
use gw_core::strangeness::NonConformity;
use gw_core::transform::Transform;
use gw_core::GroupAnomaly;

fn t(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap() + Duration::minutes(minute as i64)
}

fn fleet_config(nb_units: usize) -> GroupConfig {
    GroupConfig {
        nb_units,
        ids_target_units: (0..nb_units).map(UnitId).collect(),
        w_ref_group: Duration::minutes(10),
        non_conformity: NonConformity::Median,
        transformer: Transform::None,
        dev_threshold: 0.6,
        w_martingale: 15,
        ..Default::default()
    }
}

#[test]
fn test_identical_units_never_deviate() {
    let mut group = GroupAnomaly::new(fleet_config(3)).unwrap();
    let sample = vec![1.0, 2.0];

    for m in 0..50 {
        let out = group
            .step(t(m), &[sample.clone(), sample.clone(), sample.clone()])
            .unwrap();
        for (uid, ctx) in out.iter().enumerate() {
            assert!(ctx.in_bounds());
            assert!(
                !ctx.is_deviating,
                "unit {} flagged at step {} with deviation {}",
                uid, m, ctx.deviation
            );
        }
    }
}

#[test]
fn test_shifted_unit_crosses_threshold_within_window() {
    let mut group = GroupAnomaly::new(fleet_config(4)).unwrap();
    let baseline = vec![5.0, -2.0];
    let shifted = vec![105.0, 98.0];

    let mut first_flagged = None;
    let mut peer_max: f64 = 0.0;

    for m in 0..60 {
        let x0 = if m >= 20 { shifted.clone() } else { baseline.clone() };
        let out = group
            .step(
                t(m),
                &[x0, baseline.clone(), baseline.clone(), baseline.clone()],
            )
            .unwrap();

        if out[0].is_deviating && first_flagged.is_none() {
            first_flagged = Some(m);
        }
        for ctx in &out[1..] {
            peer_max = peer_max.max(ctx.deviation);
        }
    }

    let flagged_at = first_flagged.expect("shifted unit was never flagged");
    assert!(
        (20..=20 + 15).contains(&flagged_at),
        "expected detection within the martingale window after the shift, got step {}",
        flagged_at
    );
    assert!(
        peer_max < 0.6,
        "peer deviation reached {} while only unit 0 shifted",
        peer_max
    );
}

#[test]
fn test_window_shorter_than_sampling_interval_is_always_neutral() {
    let mut group = GroupAnomaly::new(GroupConfig {
        w_ref_group: Duration::seconds(1),
        ..fleet_config(3)
    })
    .unwrap();

    for m in 0..10 {
        let out = group
            .step(t(m), &[vec![1.0], vec![2.0], vec![3.0]])
            .unwrap();
        assert_eq!(out, vec![DeviationContext::neutral(); 3]);
    }
    // Nothing was ever recorded for any detector.
    for uid in 0..3 {
        let state = group.detector_state(UnitId(uid)).unwrap();
        assert!(state.timestamps.is_empty());
    }
}

#[test]
fn test_identical_runs_are_reproducible() {
    let run = || {
        let mut group = GroupAnomaly::new(GroupConfig {
            seed: 1234,
            transformer: Transform::Pvalue,
            ..fleet_config(3)
        })
        .unwrap();
        let mut all = Vec::new();
        // Deterministic pseudo-random stream shared by both runs.
        let mut state = 9u64;
        for m in 0..40 {
            let mut samples = Vec::new();
            for _ in 0..3 {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let v = (state >> 33) as f64 / (1u64 << 31) as f64;
                samples.push(vec![v, 1.0 - v]);
            }
            all.extend(group.step(t(m), &samples).unwrap());
        }
        all
    };

    assert_eq!(run(), run());
}

#[test]
fn test_different_seeds_differ() {
    let run = |seed: u64| {
        let mut group = GroupAnomaly::new(GroupConfig {
            seed,
            ..fleet_config(3)
        })
        .unwrap();
        let mut pvalues = Vec::new();
        for m in 0..20 {
            let out = group
                .step(t(m), &[vec![1.0], vec![1.0], vec![1.0]])
                .unwrap();
            pvalues.extend(out.into_iter().map(|ctx| ctx.pvalue));
        }
        pvalues
    };

    assert_ne!(run(1), run(2));
}

#[test]
fn test_transformed_history_tracks_raw_history() {
    let mut group = GroupAnomaly::new(GroupConfig {
        transformer: Transform::Pvalue,
        ..fleet_config(2)
    })
    .unwrap();

    for m in 0..25 {
        group
            .step(t(m), &[vec![m as f64], vec![-(m as f64)]])
            .unwrap();
        for uid in [UnitId(0), UnitId(1)] {
            let raw = group.raw_history(uid).unwrap().len();
            let transformed = group.transformed_history(uid).unwrap().len();
            assert_eq!(raw, transformed);
            assert_eq!(raw, (m + 1) as usize);
        }
    }
}

#[test]
fn test_neighbor_policies_end_to_end() {
    for policy in [NonConformity::Knn, NonConformity::Lof] {
        let mut group = GroupAnomaly::new(GroupConfig {
            non_conformity: policy,
            k: 3,
            ..fleet_config(3)
        })
        .unwrap();

        for m in 0..30 {
            let wobble = (m % 5) as f64 * 0.1;
            let out = group
                .step(
                    t(m),
                    &[
                        vec![1.0 + wobble, 2.0],
                        vec![1.0, 2.0 + wobble],
                        vec![1.0 - wobble, 2.0],
                    ],
                )
                .unwrap();
            for ctx in out {
                assert!(ctx.in_bounds(), "{} produced {:?}", policy, ctx);
                assert_eq!(ctx.is_deviating, ctx.deviation >= 0.6);
            }
        }
    }
}

#[test]
fn test_diagnostics_follow_detector_state() {
    let mut group = GroupAnomaly::new(fleet_config(2)).unwrap();
    for m in 0..12 {
        group.step(t(m), &[vec![1.0, 2.0], vec![1.5, 2.5]]).unwrap();
    }
    for uid in [UnitId(0), UnitId(1)] {
        let state = group.detector_state(uid).unwrap();
        let diag = group.detector_diagnostics(uid).unwrap();
        assert_eq!(diag.representatives.len(), state.timestamps.len());
        assert_eq!(diag.diffs.len(), state.timestamps.len());
        // Representatives carry the feature width of the transformed space.
        assert!(diag.representatives.iter().all(|r| r.len() == 2));
    }
}
