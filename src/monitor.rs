//! Pluggable convergence monitors consulted between sweeps.

/// A stopping rule consulted after each completed sweep.
///
/// Modeled as a tagged enum rather than a trait object: exactly three
/// variants exist and none carries behavior beyond a threshold comparison,
/// so an open `dyn` dispatch point would buy nothing.
#[derive(Clone, Copy, Debug)]
pub enum ConvergenceMonitor {
    /// Stop once `off_current <= threshold`.
    AbsoluteThreshold { threshold: f64 },
    /// Stop once `sweep_index >= max_sweeps`. Counts sweeps, not rounds.
    MaxIterations { max_sweeps: usize },
    /// Stop once `sweep_index >= 1` and `|off_previous - off_current| <= delta`.
    RelativeDifference { delta: f64 },
}

/// Default absolute-threshold magnitude (spec default).
pub const DEFAULT_THRESHOLD: f64 = 1e-5;
/// Default relative-difference magnitude (spec default).
pub const DEFAULT_DIFFERENCE: f64 = 1e-2;

impl ConvergenceMonitor {
    pub fn threshold(threshold: f64) -> Self {
        Self::AbsoluteThreshold { threshold }
    }

    pub fn max_iterations(max_sweeps: usize) -> Self {
        Self::MaxIterations { max_sweeps }
    }

    pub fn relative_difference(delta: f64) -> Self {
        Self::RelativeDifference { delta }
    }

    /// Evaluate the stopping rule. `off_current` not finite always stops,
    /// regardless of variant, to bound runtime on ill-posed inputs.
    pub fn should_stop(&self, sweep_index: usize, off_current: f64, off_previous: f64) -> bool {
        if !off_current.is_finite() {
            return true;
        }

        match *self {
            ConvergenceMonitor::AbsoluteThreshold { threshold } => off_current <= threshold,
            ConvergenceMonitor::MaxIterations { max_sweeps } => sweep_index >= max_sweeps,
            ConvergenceMonitor::RelativeDifference { delta } => {
                sweep_index >= 1 && (off_previous - off_current).abs() <= delta
            }
        }
    }
}
