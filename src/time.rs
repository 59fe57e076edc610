//! Timestep handling: the fallback step oracle and the stability check that decides when
//! to consult it.

use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source of the host simulation's nominal fixed step.
///
/// The controller queries this only when the caller-supplied `dt` falls outside the
/// stability band. Implementations should return a positive value; the controller stores
/// whatever comes back as its next `last_dt`.
pub trait StepSource<T: Float> {
    /// The canonical simulation step currently configured on the host.
    fn nominal_step(&self) -> T;
}

/// A nominal step that never changes unless the owner rewrites it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct FixedStep<T: Float>(pub T);

impl<T: Float> StepSource<T> for FixedStep<T> {
    fn nominal_step(&self) -> T {
        self.0
    }
}

impl<T: Float> StepSource<T> for &FixedStep<T> {
    fn nominal_step(&self) -> T {
        self.0
    }
}

impl<T: Float, F: Fn() -> T> StepSource<T> for F {
    fn nominal_step(&self) -> T {
        self()
    }
}

/// Returns true when `dt` is within `band` (relative, exclusive) of `last_dt`.
///
/// While `last_dt` is positive, zero, negative and NaN timesteps never pass. The controller
/// keeps `last_dt` positive as long as its [`StepSource`] returns positive steps.
pub fn dt_is_constant<T: Float>(dt: T, last_dt: T, band: T) -> bool {
    (dt / last_dt - T::one()).abs() < band
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn test_band_is_exclusive() {
        assert!(dt_is_constant(1.0999, 1.0, 0.1));
        assert!(dt_is_constant(0.9001, 1.0, 0.1));
        assert!(!dt_is_constant(1.11, 1.0, 0.1));
        assert!(!dt_is_constant(0.89, 1.0, 0.1));
    }

    #[test]
    fn test_degenerate_dt_is_never_constant() {
        assert!(!dt_is_constant(0.0, 0.02, 0.1));
        assert!(!dt_is_constant(-0.02, 0.02, 0.1));
        assert!(!dt_is_constant(f64::NAN, 0.02, 0.1));
        assert!(!dt_is_constant(f64::INFINITY, 0.02, 0.1));
    }

    #[test]
    fn test_closure_source_tracks_host_reconfiguration() {
        let host_step = Cell::new(0.02_f64);
        let source = || host_step.get();

        assert_eq!(source.nominal_step(), 0.02);
        host_step.set(0.05);
        assert_eq!(source.nominal_step(), 0.05);
    }

    #[test]
    fn test_borrowed_fixed_step_is_a_source() {
        let step = FixedStep(0.02_f64);
        let borrowed = &step;

        assert_eq!(borrowed.nominal_step(), 0.02);
        assert_eq!(StepSource::<f64>::nominal_step(&borrowed), 0.02);
    }
}
