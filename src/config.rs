//! Controller configuration and its fluent builder.

use core::fmt;
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "std")]
use thiserror::Error;

use crate::controller::PdController;
use crate::time::StepSource;

/// Rejected configuration values.
///
/// Gains are never validated; only the values the timestep logic depends on.
#[cfg_attr(feature = "std", derive(Error))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PdConfigError {
    /// The relative timestep tolerance is non-positive or non-finite.
    #[cfg_attr(feature = "std", error("Stability band is non-positive or non-finite"))]
    InvalidStabilityBand,

    /// The initial timestep is non-positive or non-finite.
    #[cfg_attr(feature = "std", error("Initial timestep is non-positive or non-finite"))]
    InvalidInitialStep,
}

#[cfg(not(feature = "std"))]
impl fmt::Display for PdConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdConfigError::InvalidStabilityBand => {
                f.write_str("Stability band is non-positive or non-finite")
            }
            PdConfigError::InvalidInitialStep => {
                f.write_str("Initial timestep is non-positive or non-finite")
            }
        }
    }
}

/// Configuration for the PD controller
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PdConfig<T: Float> {
    /// Proportional gain
    pub kp: T,
    /// Derivative gain. Zero disables derivative estimation.
    pub kd: T,
    /// Relative tolerance between consecutive timesteps. A `dt` with
    /// `|dt / last_dt - 1| >= stability_band` is treated as a time anomaly.
    pub stability_band: T,
    /// Timestep assumed before the first evaluation and after a reset.
    pub initial_dt: T,
}

impl<T: Float> Default for PdConfig<T> {
    fn default() -> Self {
        Self {
            kp: T::one(),
            kd: T::from(0.01).unwrap(),
            stability_band: T::from(0.1).unwrap(),
            initial_dt: T::one(),
        }
    }
}

impl<T: Float> PdConfig<T> {
    /// Check the values the timestep logic relies on.
    pub fn validate(&self) -> Result<(), PdConfigError> {
        if !self.stability_band.is_finite() || self.stability_band <= T::zero() {
            return Err(PdConfigError::InvalidStabilityBand);
        }
        if !self.initial_dt.is_finite() || self.initial_dt <= T::zero() {
            return Err(PdConfigError::InvalidInitialStep);
        }
        Ok(())
    }
}

impl<T: Float + fmt::Display> fmt::Display for PdConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kp={} kd={} band={} initial_dt={}",
            self.kp, self.kd, self.stability_band, self.initial_dt
        )
    }
}

/// Fluent construction of a [`PdController`], validated on `build`
pub struct PdBuilder<T: Float> {
    config: PdConfig<T>,
}

impl<T: Float> PdBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: PdConfig::default(),
        }
    }

    pub fn gains(mut self, kp: T, kd: T) -> Self {
        self.config.kp = kp;
        self.config.kd = kd;
        self
    }

    pub fn stability_band(mut self, band: T) -> Self {
        self.config.stability_band = band;
        self
    }

    pub fn initial_dt(mut self, dt: T) -> Self {
        self.config.initial_dt = dt;
        self
    }

    pub fn config(&self) -> &PdConfig<T> {
        &self.config
    }

    pub fn build<S: StepSource<T>>(
        self,
        step_source: S,
    ) -> Result<PdController<T, S>, PdConfigError> {
        PdController::new(self.config, step_source)
    }
}

impl<T: Float> Default for PdBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
