//! The Jacobi rotation kernel: compute and apply a single 2x2 similarity
//! that zeroes a chosen off-diagonal entry of a symmetric matrix.

use crate::matrix::Matrix;
use std::time::{Duration, Instant};

/// Floor below which `A(p,q)` is considered already annihilated; avoids
/// wasted rotations and division-by-near-zero in the `theta` computation.
const ANNIHILATION_EPSILON: f32 = 1e-12;

/// A single Jacobi rotation: `p < q`, `c^2 + s^2 = 1`.
///
/// Carries the pre-rotation `A(p,p)`/`A(q,q)`/`A(p,q)` alongside `(c, s)` so
/// `apply_post`'s closed-form diagonal-block update can use them without
/// re-reading the matrix after `apply_pre` has already overwritten the rows
/// they live in.
#[derive(Copy, Clone, Debug)]
pub struct Rotation {
    pub p: usize,
    pub q: usize,
    pub c: f32,
    pub s: f32,
    pub app: f32,
    pub aqq: f32,
    pub apq: f32,
}

/// Pure rotation math: given the current `A(p,p)`, `A(q,q)`, `A(p,q)`,
/// return the `(c, s)` pair that zeroes `A(p,q)`, or `None` if it is
/// already within the annihilation floor of zero. Factored out of
/// `compute_rotation` so the parallel sweep engine's raw-pointer rotation
/// path (`crate::sweep`) can share the same formula instead of
/// re-deriving it against a different matrix accessor.
pub fn compute_c_s(app: f32, aqq: f32, apq: f32) -> Option<(f32, f32)> {
    let scale = app.abs().max(aqq.abs()).max(apq.abs());
    if apq.abs() <= ANNIHILATION_EPSILON * scale.max(1.0) {
        return None;
    }

    let theta = (aqq - app) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + (1.0 + theta * theta).sqrt());
    let c = 1.0 / (1.0 + t * t).sqrt();
    let s = t * c;

    Some((c, s))
}

/// Compute the rotation that zeroes `A(p, q)`, or `None` if `A(p, q)` is
/// already within the annihilation floor of zero.
pub fn compute_rotation(a: &Matrix, p: usize, q: usize) -> Option<Rotation> {
    debug_assert!(p < q);
    let app = a.get(p, p);
    let aqq = a.get(q, q);
    let apq = a.get(p, q);

    let (c, s) = compute_c_s(app, aqq, apq)?;
    Some(Rotation { p, q, c, s, app, aqq, apq })
}

/// Row-update ("pre-multiplication") phase: for every column `r != p, q`
/// with `r < n`, replace `A(p, r)` and `A(q, r)` with the rotation's linear
/// combination of themselves. Touches rows `p` and `q` only — never a
/// column write, never the `{p,q}` block itself (left to `apply_post`'s
/// closed form). Returns the wall-clock time this phase took, for the
/// caller to fold into the shared timer tree.
pub fn apply_pre(a: &mut Matrix, rot: Rotation) -> Duration {
    let start = Instant::now();
    let n = a.actual_size();
    let Rotation { p, q, c, s, .. } = rot;

    for r in 0..n {
        if r == p || r == q {
            continue;
        }
        let apr = a.get(p, r);
        let aqr = a.get(q, r);
        let new_pr = c * apr - s * aqr;
        let new_qr = s * apr + c * aqr;
        a.set(p, r, new_pr);
        a.set(q, r, new_qr);
    }

    start.elapsed()
}

/// Column-update ("post-multiplication") phase: for every row `r != p, q`
/// with `r < n`, replace `A(r, p)` and `A(r, q)` with the rotation's linear
/// combination of themselves, reading `apply_pre`'s output (not the
/// pre-round matrix). Must run only after `apply_pre` for this rotation —
/// and, when called from the concurrent sweep engine, after every pair's
/// row phase in the same round — has completed. Then closes out the 2x2
/// block `{A(p,p), A(p,q), A(q,p), A(q,q)}` in closed form from the
/// rotation's captured pre-rotation values, forcing `A(p,q) = A(q,p) = 0`
/// to suppress rounding drift. Returns the wall-clock time this phase took.
pub fn apply_post(a: &mut Matrix, rot: Rotation) -> Duration {
    let start = Instant::now();
    let n = a.actual_size();
    let Rotation { p, q, c, s, app, aqq, apq } = rot;

    for r in 0..n {
        if r == p || r == q {
            continue;
        }
        let arp = a.get(r, p);
        let arq = a.get(r, q);
        let new_rp = c * arp - s * arq;
        let new_rq = s * arp + c * arq;
        a.set(r, p, new_rp);
        a.set(r, q, new_rq);
    }

    let new_pp = c * c * app - 2.0 * s * c * apq + s * s * aqq;
    let new_qq = s * s * app + 2.0 * s * c * apq + c * c * aqq;

    a.set(p, p, new_pp);
    a.set(q, q, new_qq);
    a.set(p, q, 0.0);
    a.set(q, p, 0.0);

    start.elapsed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroes_the_target_entry() {
        let mut a = Matrix::from_rows(2, &[2.0, 1.0, 1.0, 2.0]);
        let rot = compute_rotation(&a, 0, 1).expect("entry should not be annihilated already");
        apply_pre(&mut a, rot);
        apply_post(&mut a, rot);
        assert!(a.get(0, 1).abs() < 1e-6);
        assert!(a.get(1, 0).abs() < 1e-6);
    }

    #[test]
    fn already_zero_returns_none() {
        let a = Matrix::from_rows(2, &[2.0, 0.0, 0.0, 3.0]);
        assert!(compute_rotation(&a, 0, 1).is_none());
    }

    #[test]
    fn preserves_trace_on_2x2() {
        let mut a = Matrix::from_rows(2, &[2.0, 1.0, 1.0, 2.0]);
        let trace_before = a.trace();
        let rot = compute_rotation(&a, 0, 1).unwrap();
        apply_pre(&mut a, rot);
        apply_post(&mut a, rot);
        assert!((a.trace() - trace_before).abs() < 1e-4);
    }

    #[test]
    fn preserves_frobenius_norm_on_2x2() {
        let mut a = Matrix::from_rows(2, &[2.0, 1.0, 1.0, 2.0]);
        let norm_before = a.frobenius_norm();
        let rot = compute_rotation(&a, 0, 1).unwrap();
        apply_pre(&mut a, rot);
        apply_post(&mut a, rot);
        assert!((a.frobenius_norm() - norm_before).abs() < 1e-4);
    }
}
