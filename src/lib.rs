//! # Bumpless PD Control Element
//!
//! A single-input, single-output proportional-derivative controller meant to sit inside a
//! flight-control cascade where the simulation timestep is irregular: time warp, pauses and
//! physics-rate changes all deliver `dt` values that would turn a naive finite difference
//! into an actuator jerk.
//!
//! ## Key Features
//! - **Timestep anomaly detection**: a `dt` more than 10% away from the previous one is
//!   replaced by the host's nominal step for the derivative term
//! - **Re-basing** of the differencing state whenever an anomaly is detected
//! - **Two derivative modes**: estimated from history, or supplied by the caller
//! - **Injected time source** instead of a process-wide clock
//! - **Live gains** writable between ticks
//! - **Diagnostics** counting substitutions and derivative-mode switches
//!
//! ```
//! use bumpless_pd::{FixedStep, PdController};
//!
//! let mut pd = PdController::with_gains(1.0, 0.01, FixedStep(0.02));
//! let correction = pd.control(0.0, 10.0, 0.02);
//! assert_eq!(correction, 10.0);
//! ```
//!
//! No integral action: steady-state offset is accepted in exchange for phase margin.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod controller;
pub mod time;

pub use config::{PdBuilder, PdConfig, PdConfigError};
pub use controller::{DerivativeSource, LastInputKind, PdController, PdDiagnostics, PdOutput};
pub use time::{dt_is_constant, FixedStep, StepSource};

// ============================================================================
// Tests
// ============================================================================
