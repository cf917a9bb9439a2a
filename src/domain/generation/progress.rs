//! Locally simulated progress for pending tasks.
//!
//! The provider reports nothing between dispatch and completion, so the
//! client shows a curve that closes a fixed fraction of the remaining gap on
//! every poll. It is display-only and never feeds a polling decision.

use crate::domain::foundation::Percentage;

const CEILING: f64 = 100.0;
const DEFAULT_STEP_FRACTION: f64 = 0.05;

/// Monotonic progress estimate that approaches but never reports 100%.
#[derive(Debug, Clone)]
pub struct SimulatedProgress {
    value: f64,
    step_fraction: f64,
}

impl SimulatedProgress {
    pub fn new() -> Self {
        Self::with_step_fraction(DEFAULT_STEP_FRACTION)
    }

    /// Creates a simulator closing `fraction` of the remaining gap per step.
    ///
    /// The fraction is clamped into `(0, 1)`.
    pub fn with_step_fraction(fraction: f64) -> Self {
        let step_fraction = if fraction.is_finite() {
            fraction.clamp(0.001, 0.999)
        } else {
            DEFAULT_STEP_FRACTION
        };
        Self {
            value: 0.0,
            step_fraction,
        }
    }

    /// Advances one poll and returns the value to display.
    pub fn advance(&mut self) -> Percentage {
        self.value += (CEILING - self.value) * self.step_fraction;
        self.current()
    }

    /// Current display value, capped at 99 while the task is pending.
    pub fn current(&self) -> Percentage {
        Percentage::from_f64_floor(self.value.min(CEILING - 1.0))
    }
}

impl Default for SimulatedProgress {
    fn default() -> Self {
        Self::new()
    }
}
