//! Quantified invariants exercised over randomized/symbolic inputs.

use approx::assert_abs_diff_eq;
use parallel_jacobi::io::generate_random_symmetric;
use parallel_jacobi::monitor::ConvergenceMonitor;
use parallel_jacobi::pairing::{MusicPairing, PairingGenerator};
use parallel_jacobi::sweep::SweepEngine;
use parallel_jacobi::timer::TimerNode;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn pairing_covers_every_pair_exactly_once(n in 2usize..40) {
        let pairing = MusicPairing::new(n);
        let m = pairing.padded_size();
        let rounds = pairing.sweep_rounds();

        prop_assert_eq!(rounds.len(), m - 1);

        let mut seen = HashSet::new();
        for round in &rounds {
            prop_assert_eq!(round.len(), m / 2);
            let mut touched = HashSet::new();
            for &(p, q) in round {
                prop_assert!(p < q);
                prop_assert!(touched.insert(p));
                prop_assert!(touched.insert(q));
                prop_assert!(seen.insert((p, q)));
            }
        }
        prop_assert_eq!(seen.len(), m * (m - 1) / 2);
    }

    #[test]
    fn trace_and_frobenius_squared_are_preserved(n in 2usize..12, seed in 0u64..50) {
        let mut a = generate_random_symmetric(n, seed);
        let trace_before = a.trace();
        let frob_before = a.frobenius_norm();

        let monitor = ConvergenceMonitor::max_iterations(3);
        let pairing = MusicPairing::new(n);
        let mut timer = TimerNode::new("run");
        SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);

        prop_assert!((a.trace() - trace_before).abs() < 1e-2 * (1.0 + trace_before.abs()));
        prop_assert!((a.frobenius_norm() - frob_before).abs() < 1e-2 * (1.0 + frob_before));
    }

    #[test]
    fn symmetry_is_preserved_within_tolerance(n in 2usize..12, seed in 0u64..50) {
        let mut a = generate_random_symmetric(n, seed);
        let frob = a.frobenius_norm() as f32;

        let monitor = ConvergenceMonitor::max_iterations(3);
        let pairing = MusicPairing::new(n);
        let mut timer = TimerNode::new("run");
        SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);

        prop_assert!(a.is_symmetric(1e-3 * frob.max(1.0)));
    }
}

#[test]
fn off_diagonal_norm_is_monotone_non_increasing_across_sweeps() {
    let a = generate_random_symmetric(10, 7);
    let mut off_by_sweep = Vec::new();

    for sweeps in 0..6 {
        let mut copy = a.clone();
        let monitor = ConvergenceMonitor::max_iterations(sweeps);
        let pairing = MusicPairing::new(10);
        let mut timer = TimerNode::new("run");
        let report = SweepEngine::run(&mut copy, &monitor, &pairing, &mut timer);
        off_by_sweep.push(report.off_final);
    }

    for pair in off_by_sweep.windows(2) {
        let tolerance = 1e-3 * (1.0 + off_by_sweep[0]);
        assert!(pair[1] <= pair[0] + tolerance, "off(A) increased: {:?}", off_by_sweep);
    }
}

#[test]
fn timer_round_trip_matches_to_nine_decimal_places() {
    let mut root = TimerNode::new("run");
    root.add_duration(std::time::Duration::from_secs_f64(2.718281828));
    root.child_mut("pre-multiplication").add_duration(std::time::Duration::from_secs_f64(1.1));
    root.child_mut("post-multiplication").add_duration(std::time::Duration::from_secs_f64(1.6));

    let parsed = TimerNode::parse(&root.serialize()).unwrap();
    assert_abs_diff_eq!(parsed.elapsed_secs(), root.elapsed_secs(), epsilon = 1e-9);
    assert_abs_diff_eq!(
        parsed.find("pre-multiplication").unwrap().elapsed_secs(),
        root.find("pre-multiplication").unwrap().elapsed_secs(),
        epsilon = 1e-9
    );
}
