//! # Parallel Jacobi eigensolver
//!
//! A parallel block Jacobi eigenvalue solver for dense real symmetric
//! matrices. Given a symmetric matrix `A`, repeatedly applies disjoint
//! Jacobi rotations in parallel rounds until the off-diagonal Frobenius
//! mass is driven below a chosen tolerance; the diagonal of the result is
//! the eigenvalue spectrum.
//!
//! The core (matrix store, rotation kernel, pairing generator, sweep
//! engine, convergence monitor, timer) is usable as a library. Matrix I/O,
//! random generation, and the Gaussian-elimination sanity check are
//! external collaborators consumed by the CLI binary.

pub mod error;
pub mod gaussian;
pub mod io;
pub mod matrix;
pub mod monitor;
pub mod pairing;
pub mod rotation;
pub mod sweep;
pub mod timer;

#[cfg(test)]
mod tests_fixtures;

pub use error::{JacobiError, Result};
pub use matrix::Matrix;
pub use monitor::ConvergenceMonitor;
pub use pairing::{MusicPairing, PairingGenerator};
pub use sweep::{SweepEngine, SweepReport, SweepStatus};
pub use timer::TimerNode;