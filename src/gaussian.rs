//! Gaussian elimination with partial pivoting, used only by the `--check`
//! CLI path to verify a computed eigenvalue: `A - lambda*I` should be
//! singular for every eigenvalue `lambda` of `A`.
//!
//! This is an external collaborator, not part of the eigensolver core —
//! ported from `gaussian_elimination.cc` (itself "Golub and Van Loan p112,
//! Algorithm 3.4.1").

use crate::matrix::Matrix;

/// Returns `true` if elimination completes with every pivot above
/// tolerance (i.e. `A` is invertible); `false` as soon as a pivot column
/// is found to be zero within tolerance (i.e. `A` is singular).
///
/// Mutates `a` in place into (partial) row-echelon form; callers that
/// need the original matrix afterwards should pass a clone.
pub fn gaussian_elimination(a: &mut Matrix) -> bool {
    let n = a.actual_size();
    let epsilon = 1e-2 * a.frobenius_norm() as f32;

    for k in 0..n {
        let mut pivot_row = k;
        for i in k..n {
            if a.get(i, k).abs() > a.get(pivot_row, k).abs() {
                pivot_row = i;
            }
        }
        a.swap_rows(k, pivot_row);

        let pivot = a.get(k, k);
        if pivot.abs() <= epsilon {
            return false;
        }

        for r in (k + 1)..n {
            let multiple = a.get(r, k) / pivot;
            for u in k..n {
                let reduced = a.get(r, u) - multiple * a.get(k, u);
                a.set(r, u, reduced);
            }
        }
    }
    true
}
