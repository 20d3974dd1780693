//! Matrix I/O: random symmetric generation and the stdin input grammar.
//!
//! An external collaborator to the solver core — neither is consulted by
//! `sweep.rs`, only by the CLI driver.

use crate::error::{JacobiError, Result};
use crate::matrix::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Read;

/// Generate an `n x n` symmetric matrix from a fixed seed, reproducible
/// across runs (and across thread counts, since generation itself is
/// single-threaded and happens before the timed region).
pub fn generate_random_symmetric(n: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = vec![0.0f32; n * n];
    for i in 0..n {
        for j in i..n {
            let v: f32 = rng.gen_range(-5.0..5.0);
            values[i * n + j] = v;
            values[j * n + i] = v;
        }
    }
    Matrix::from_rows(n, &values)
}

/// Parse the stdin format: an integer `N`, then `N*N` whitespace-separated
/// floats in row-major order. `InputError` on a short or non-numeric feed.
pub fn read_matrix_from_stdin() -> Result<Matrix> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(JacobiError::IoError)?;
    parse_matrix(&text)
}

fn parse_matrix(text: &str) -> Result<Matrix> {
    let mut tokens = text.split_whitespace();

    let n: usize = tokens
        .next()
        .ok_or_else(|| JacobiError::InputError("missing matrix order N".to_string()))?
        .parse()
        .map_err(|_| JacobiError::InputError("matrix order N is not an integer".to_string()))?;

    let mut values = Vec::with_capacity(n * n);
    for _ in 0..(n * n) {
        let tok = tokens
            .next()
            .ok_or_else(|| JacobiError::InputError(format!("expected {} values, input ran short", n * n)))?;
        let v: f32 = tok
            .parse()
            .map_err(|_| JacobiError::InputError(format!("non-numeric matrix entry: {tok}")))?;
        values.push(v);
    }

    Ok(Matrix::from_rows(n, &values))
}
