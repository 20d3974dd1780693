//! The sweep engine: drives rounds of disjoint rotations in parallel,
//! refreshing the pairing each sweep, and checking the convergence
//! monitor between sweeps.

use crate::matrix::Matrix;
use crate::monitor::ConvergenceMonitor;
use crate::pairing::PairingGenerator;
use crate::rotation::compute_c_s;
use crate::timer::TimerNode;
use log::warn;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Safety cap on sweep count: bounds runtime on inputs the monitor never
/// signals stop for.
const SAFETY_CAP_SWEEPS: usize = 100;

/// How the sweep engine terminated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SweepStatus {
    /// The convergence monitor signalled stop (or off(A) hit machine
    /// precision).
    Converged,
    /// The safety cap of sweeps was reached before the monitor stopped.
    SafetyCapReached,
    /// off(A) became non-finite; the engine halted early.
    NonFinite,
}

/// Summary of a completed (or halted) solve.
#[derive(Clone, Copy, Debug)]
pub struct SweepReport {
    pub sweeps: usize,
    pub rounds: usize,
    pub off_final: f64,
    pub status: SweepStatus,
}

/// A raw, disjointness-trusting view over a matrix's backing storage.
///
/// Safety: within one round, the sweep engine runs two genuinely disjoint,
/// barrier-separated passes over `round`'s pairs instead of one fused pass
/// per pair:
///
/// - the row phase (`row_phase_raw`) writes only to row `p` and row `q` for
///   each pair, reading only from those same two rows. Since
///   `PairingGenerator` (§4.3) guarantees every index is claimed by at most
///   one pair per round, two concurrently-running row phases never target
///   the same row, and neither ever reads a row another pair owns — so
///   there is nothing for the barrier itself to order yet, every pair's row
///   phase is independently self-contained.
/// - the column phase (`column_phase_raw`) then writes only to column `p`
///   and column `q` for each pair — again disjoint across pairs by the same
///   invariant — but reads whatever the row phase left behind in *any* row,
///   including rows owned by other pairs. That cross-pair read is only safe
///   because every pair's row phase, across the whole round, has already
///   finished: the two `round.par_iter()` passes in `SweepEngine::run` are
///   separate, sequentially-issued calls, and each runs rayon's parallel
///   iterator to completion (via `.sum()`) before the next one starts. That
///   sequencing *is* the barrier; there is no pass that writes a cell while
///   another pass might still be reading or writing it.
///
/// Concretely: the cells `row_phase_raw` and `column_phase_raw` touch for a
/// single pair `(p, q)` are rows `{p, q}` (row phase) and then columns
/// `{p, q}` (column phase) — never a row-and-column-at-once write to a cell
/// some other active pair owns, which is what made a single fused
/// pre-multiplication-and-post-multiplication pass per pair race.
#[derive(Clone, Copy)]
struct RawView {
    ptr: *mut f32,
    m: usize,
}

unsafe impl Send for RawView {}
unsafe impl Sync for RawView {}

impl RawView {
    #[inline]
    unsafe fn get(&self, i: usize, j: usize) -> f32 {
        *self.ptr.add(i * self.m + j)
    }

    #[inline]
    unsafe fn set(&self, i: usize, j: usize, v: f32) {
        *self.ptr.add(i * self.m + j) = v;
    }
}

/// A rotation pending application within one round: the pivot pair, its
/// `(c, s)`, and the pre-round `A(p,p)`/`A(q,q)`/`A(p,q)` needed for the
/// column phase's closed-form finish. Computed once per pair, before
/// either phase of the round runs, from data neither phase has touched yet.
#[derive(Clone, Copy)]
struct PendingRotation {
    p: usize,
    q: usize,
    c: f32,
    s: f32,
    app: f32,
    aqq: f32,
    apq: f32,
}

/// Row phase ("pre-multiplication") for one pair: rows `p` and `q` only,
/// every column `r != p, q` with `r < n`. See `RawView`'s doc comment for
/// why this is safe to run concurrently with every other pair's row phase
/// in the same round.
unsafe fn row_phase_raw(view: RawView, n: usize, rot: PendingRotation) -> Duration {
    let start = Instant::now();
    let PendingRotation { p, q, c, s, .. } = rot;

    for r in 0..n {
        if r == p || r == q {
            continue;
        }
        let apr = view.get(p, r);
        let aqr = view.get(q, r);
        view.set(p, r, c * apr - s * aqr);
        view.set(q, r, s * apr + c * aqr);
    }

    start.elapsed()
}

/// Column phase ("post-multiplication") for one pair: columns `p` and `q`
/// only, every row `r != p, q` with `r < n`, reading the row phase's
/// output — then the closed-form `{p, q}` diagonal block from the pair's
/// pre-round values. The caller must not invoke this for any pair in a
/// round until every pair's `row_phase_raw` in that round has returned;
/// see `RawView`'s doc comment.
unsafe fn column_phase_raw(view: RawView, n: usize, rot: PendingRotation) -> Duration {
    let start = Instant::now();
    let PendingRotation { p, q, c, s, app, aqq, apq } = rot;

    for r in 0..n {
        if r == p || r == q {
            continue;
        }
        let arp = view.get(r, p);
        let arq = view.get(r, q);
        view.set(r, p, c * arp - s * arq);
        view.set(r, q, s * arp + c * arq);
    }

    let new_pp = c * c * app - 2.0 * s * c * apq + s * s * aqq;
    let new_qq = s * s * app + 2.0 * s * c * apq + c * c * aqq;
    view.set(p, p, new_pp);
    view.set(q, q, new_qq);
    view.set(p, q, 0.0);
    view.set(q, p, 0.0);

    start.elapsed()
}

/// Drives rounds of disjoint rotations in parallel, refreshing the
/// pairing each sweep, until the convergence monitor says stop.
pub struct SweepEngine;

impl SweepEngine {
    /// Run the solve to convergence (or until the safety cap / a
    /// non-finite off-diagonal norm halts it).
    ///
    /// `timer` is the "run" node; this call starts/stops it and folds the
    /// "pre-multiplication"/"post-multiplication" phase durations into
    /// its children after each round's barrier.
    pub fn run(
        a: &mut Matrix,
        monitor: &ConvergenceMonitor,
        pairing: &dyn PairingGenerator,
        timer: &mut TimerNode,
    ) -> SweepReport {
        debug_assert_eq!(a.size(), pairing.padded_size());

        timer.start();
        let n = a.actual_size();
        let rounds_per_sweep = pairing.sweep_rounds();

        let mut sweep_index = 0usize;
        let mut rounds_done = 0usize;
        let mut off_previous = a.off_diagonal_norm();
        let mut off_current = off_previous;
        let mut status = SweepStatus::Converged;

        if off_current <= f64::EPSILON {
            timer.stop();
            return SweepReport {
                sweeps: 0,
                rounds: 0,
                off_final: off_current,
                status: SweepStatus::Converged,
            };
        }

        'sweeps: loop {
            for round in &rounds_per_sweep {
                let view = RawView {
                    ptr: a.raw_mut().as_mut_ptr(),
                    m: a.size(),
                };

                let pending: Vec<PendingRotation> = round
                    .par_iter()
                    .filter(|&&(p, q)| p < n && q < n)
                    .filter_map(|&(p, q)| {
                        let app = unsafe { view.get(p, p) };
                        let aqq = unsafe { view.get(q, q) };
                        let apq = unsafe { view.get(p, q) };
                        compute_c_s(app, aqq, apq).map(|(c, s)| PendingRotation { p, q, c, s, app, aqq, apq })
                    })
                    .collect();

                // Barrier: every pair's row phase must finish before any
                // pair's column phase starts (see `RawView`'s doc comment).
                // `.sum()` drives the parallel iterator to completion before
                // this statement returns, so the second pass below never
                // overlaps the first.
                let pre_sum: Duration = pending.par_iter().map(|&rot| unsafe { row_phase_raw(view, n, rot) }).sum();
                let post_sum: Duration =
                    pending.par_iter().map(|&rot| unsafe { column_phase_raw(view, n, rot) }).sum();

                timer.child_mut("pre-multiplication").add_duration(pre_sum);
                timer.child_mut("post-multiplication").add_duration(post_sum);
                rounds_done += 1;
            }

            sweep_index += 1;
            off_previous = off_current;
            off_current = parallel_off_diagonal_norm(a);

            if !off_current.is_finite() {
                warn!("off-diagonal norm became non-finite at sweep {sweep_index}; halting");
                status = SweepStatus::NonFinite;
                break 'sweeps;
            }

            if off_current <= f64::EPSILON {
                status = SweepStatus::Converged;
                break 'sweeps;
            }

            if monitor.should_stop(sweep_index, off_current, off_previous) {
                status = SweepStatus::Converged;
                break 'sweeps;
            }

            if sweep_index >= SAFETY_CAP_SWEEPS {
                warn!("safety cap of {SAFETY_CAP_SWEEPS} sweeps reached before convergence");
                status = SweepStatus::SafetyCapReached;
                break 'sweeps;
            }
        }

        timer.stop();

        SweepReport {
            sweeps: sweep_index,
            rounds: rounds_done,
            off_final: off_current,
            status,
        }
    }
}

/// Off-diagonal Frobenius norm computed as a parallel reduction over the
/// strictly-upper triangle, doubled (the lower triangle mirrors it by the
/// symmetry invariant), with a final single-threaded combine.
fn parallel_off_diagonal_norm(a: &Matrix) -> f64 {
    let n = a.actual_size();
    let sum_sq: f64 = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut row_sum = 0.0f64;
            for j in (i + 1)..n {
                let v = a.get(i, j) as f64;
                row_sum += v * v;
            }
            row_sum
        })
        .sum();
    (2.0 * sum_sq).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::MusicPairing;

    #[test]
    fn diagonal_input_converges_immediately() {
        let mut a = Matrix::from_rows(3, &[1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0]);
        let monitor = ConvergenceMonitor::threshold(1e-5);
        let pairing = MusicPairing::new(3);
        let mut timer = TimerNode::new("run");

        let report = SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);
        assert_eq!(report.sweeps, 0);
        assert_eq!(report.status, SweepStatus::Converged);

        let mut diag = a.diagonal();
        diag.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert_eq!(diag, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn two_by_two_converges_to_known_eigenvalues() {
        let mut a = Matrix::from_rows(2, &[2.0, 1.0, 1.0, 2.0]);
        let monitor = ConvergenceMonitor::threshold(1e-6);
        let pairing = MusicPairing::new(2);
        let mut timer = TimerNode::new("run");

        let report = SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);
        assert_eq!(report.status, SweepStatus::Converged);

        let mut diag: Vec<f32> = a.diagonal();
        diag.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert!((diag[0] - 1.0).abs() < 1e-4);
        assert!((diag[1] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn symmetry_is_preserved_after_solve() {
        let mut a = Matrix::from_rows(
            4,
            &[4.0, 1.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.0, 0.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0, 2.0],
        );
        let monitor = ConvergenceMonitor::threshold(1e-6);
        let pairing = MusicPairing::new(4);
        let mut timer = TimerNode::new("run");

        SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);
        assert!(a.is_symmetric(1e-3));
    }

    #[test]
    fn trace_is_invariant_across_the_solve() {
        let mut a = Matrix::from_rows(2, &[5.0, 2.0, 2.0, 1.0]);
        let trace_before = a.trace();
        let monitor = ConvergenceMonitor::threshold(1e-6);
        let pairing = MusicPairing::new(2);
        let mut timer = TimerNode::new("run");

        SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);
        assert!((a.trace() - trace_before).abs() < 1e-3);
    }

    #[test]
    fn max_iterations_monitor_counts_sweeps_not_rounds() {
        let mut a = Matrix::from_rows(
            4,
            &[4.0, 1.0, 1.0, 1.0, 1.0, 3.0, 1.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 5.0],
        );
        let monitor = ConvergenceMonitor::max_iterations(2);
        let pairing = MusicPairing::new(4);
        let mut timer = TimerNode::new("run");

        let report = SweepEngine::run(&mut a, &monitor, &pairing, &mut timer);
        assert_eq!(report.sweeps, 2);
    }
}
