//! The PD control element and its per-cycle output and diagnostics records.

use core::fmt;
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{PdConfig, PdConfigError};
use crate::time::{dt_is_constant, StepSource};

/// Where the derivative used in a cycle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DerivativeSource {
    /// Finite difference against the stored `last_input`
    Estimated,
    /// Provided by the caller
    Supplied,
}

/// Which quantity is currently stored in `last_input`.
///
/// The estimating operation stores the error (`desire - input`), while the supplied-derivative
/// operation and any re-base store the raw input. The next estimated derivative differences
/// the new raw input against whichever of the two is held here, so switching operations on
/// one instance produces a derivative that mixes the two conventions. Call
/// [`PdController::rebase`] when switching from supplied to estimated to avoid it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LastInputKind {
    /// `desire - input` from the last estimated evaluation
    Error,
    /// Raw input from a supplied-derivative evaluation or a re-base
    Input,
}

/// Detailed control output with diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PdOutput<T: Float> {
    /// Final control output
    pub output: T,
    /// Proportional term contribution
    pub p: T,
    /// Derivative term contribution (`-derivative * kd`)
    pub d: T,
    /// Current error
    pub error: T,
    /// Derivative of the input used this cycle
    pub derivative: T,
    /// Time delta used for the derivative this cycle
    pub dt: T,
    /// True when `dt` was replaced by the nominal step
    pub dt_substituted: bool,
    /// How the derivative was obtained
    pub source: DerivativeSource,
}

/// Single-axis PD control element for variable-timestep loops.
///
/// `kp` and `kd` are plain fields so a tuning panel can write them between ticks; each
/// evaluation reads them once.
pub struct PdController<T: Float, S: StepSource<T>> {
    /// Proportional gain
    pub kp: T,
    /// Derivative gain
    pub kd: T,

    stability_band: T,
    initial_dt: T,
    step_source: S,

    // State variables
    last_dt: T,
    last_input: T,
    last_input_kind: LastInputKind,
    derivative: T,
    last_source: Option<DerivativeSource>,

    // Diagnostics
    update_count: u64,
    dt_substitutions: u64,
    source_switches: u64,
}

impl<T: Float, S: StepSource<T>> PdController<T, S> {
    /// Create a controller from a validated configuration
    pub fn new(config: PdConfig<T>, step_source: S) -> Result<Self, PdConfigError> {
        config.validate()?;
        Ok(Self::from_config(config, step_source))
    }

    /// Create a controller with default band and initial timestep
    pub fn with_gains(kp: T, kd: T, step_source: S) -> Self {
        let config = PdConfig {
            kp,
            kd,
            ..PdConfig::default()
        };
        Self::from_config(config, step_source)
    }

    fn from_config(config: PdConfig<T>, step_source: S) -> Self {
        Self {
            kp: config.kp,
            kd: config.kd,
            stability_band: config.stability_band,
            initial_dt: config.initial_dt,
            step_source,
            last_dt: config.initial_dt,
            last_input: T::zero(),
            last_input_kind: LastInputKind::Error,
            derivative: T::zero(),
            last_source: None,
            update_count: 0,
            dt_substitutions: 0,
            source_switches: 0,
        }
    }

    /// Compute the correction, estimating the input derivative from history.
    pub fn control(&mut self, input: T, desire: T, dt: T) -> T {
        self.update(input, desire, dt).output
    }

    /// Compute the correction using a caller-supplied input derivative.
    ///
    /// Leaves the raw `input` in `last_input`, so a following [`control`](Self::control)
    /// differences against it rather than against an error. See [`LastInputKind`].
    pub fn control_with_derivative(
        &mut self,
        input: T,
        input_derivative: T,
        desire: T,
        dt: T,
    ) -> T {
        self.update_with_derivative(input, input_derivative, desire, dt)
            .output
    }

    /// Same as [`control`](Self::control) but returns every intermediate term.
    pub fn update(&mut self, input: T, desire: T, dt: T) -> PdOutput<T> {
        self.evaluate(input, None, desire, dt)
    }

    /// Same as [`control_with_derivative`](Self::control_with_derivative) but returns every
    /// intermediate term.
    pub fn update_with_derivative(
        &mut self,
        input: T,
        input_derivative: T,
        desire: T,
        dt: T,
    ) -> PdOutput<T> {
        self.evaluate(input, Some(input_derivative), desire, dt)
    }

    fn evaluate(&mut self, input: T, supplied: Option<T>, desire: T, dt: T) -> PdOutput<T> {
        let kp = self.kp;
        let kd = self.kd;
        let source = match supplied {
            Some(_) => DerivativeSource::Supplied,
            None => DerivativeSource::Estimated,
        };

        self.update_count += 1;
        self.track_source(source);

        let error = desire - input;
        let p = error * kp;

        let (dt, dt_substituted) = self.effective_dt(input, dt);

        match supplied {
            Some(input_derivative) => self.derivative = input_derivative,
            // kd == 0 leaves the previous derivative in place
            None if kd != T::zero() => self.derivative = (input - self.last_input) / dt,
            None => {}
        }
        let d = -self.derivative * kd;

        self.last_dt = dt;
        match source {
            DerivativeSource::Estimated => {
                self.last_input = error;
                self.last_input_kind = LastInputKind::Error;
            }
            DerivativeSource::Supplied => {
                self.last_input = input;
                self.last_input_kind = LastInputKind::Input;
            }
        }

        PdOutput {
            output: p + d,
            p,
            d,
            error,
            derivative: self.derivative,
            dt,
            dt_substituted,
            source,
        }
    }

    /// Pick the divisor for this cycle. An out-of-band `dt` is replaced by the host's
    /// nominal step and `last_input` is re-based to the raw input.
    fn effective_dt(&mut self, input: T, dt: T) -> (T, bool) {
        if dt_is_constant(dt, self.last_dt, self.stability_band) {
            return (dt, false);
        }

        let nominal = self.step_source.nominal_step();
        debug!(
            "dt {} outside band of last dt {}, using nominal step {}",
            dt.to_f64(),
            self.last_dt.to_f64(),
            nominal.to_f64()
        );

        self.dt_substitutions += 1;
        self.last_input = input;
        self.last_input_kind = LastInputKind::Input;
        (nominal, true)
    }

    fn track_source(&mut self, source: DerivativeSource) {
        if let Some(previous) = self.last_source {
            if previous != source {
                self.source_switches += 1;
                trace!("derivative source switched from {} to {}", previous, source);
            }
        }
        self.last_source = Some(source);
    }

    /// Store a raw input as the differencing base for the next estimated derivative.
    pub fn rebase(&mut self, input: T) {
        self.last_input = input;
        self.last_input_kind = LastInputKind::Input;
    }

    /// Return to the freshly constructed state. Gains and counters are kept.
    pub fn reset(&mut self) {
        self.last_dt = self.initial_dt;
        self.last_input = T::zero();
        self.last_input_kind = LastInputKind::Error;
        self.derivative = T::zero();
        self.last_source = None;
    }

    pub fn set_gains(&mut self, kp: T, kd: T) {
        self.kp = kp;
        self.kd = kd;
    }

    /// Derivative of the input from the last evaluation
    pub fn input_derivative(&self) -> T {
        self.derivative
    }

    /// Value stored for differencing; see [`LastInputKind`] for what it holds.
    pub fn last_input(&self) -> T {
        self.last_input
    }

    pub fn last_input_kind(&self) -> LastInputKind {
        self.last_input_kind
    }

    /// Timestep used by the last evaluation
    pub fn last_dt(&self) -> T {
        self.last_dt
    }

    /// Current gains and timestep settings
    pub fn config(&self) -> PdConfig<T> {
        PdConfig {
            kp: self.kp,
            kd: self.kd,
            stability_band: self.stability_band,
            initial_dt: self.initial_dt,
        }
    }

    pub fn step_source(&self) -> &S {
        &self.step_source
    }

    /// Mutable access for hosts that reconfigure their simulation step
    pub fn step_source_mut(&mut self) -> &mut S {
        &mut self.step_source
    }

    /// Get diagnostic information
    pub fn diagnostics(&self) -> PdDiagnostics<T> {
        PdDiagnostics {
            update_count: self.update_count,
            dt_substitutions: self.dt_substitutions,
            substitution_ratio: if self.update_count > 0 {
                T::from(self.dt_substitutions).unwrap_or_else(T::zero)
                    / T::from(self.update_count).unwrap_or_else(T::one)
            } else {
                T::zero()
            },
            source_switches: self.source_switches,
            derivative: self.derivative,
            last_input: self.last_input,
            last_input_kind: self.last_input_kind,
            last_dt: self.last_dt,
        }
    }
}

impl<T: Float + fmt::Debug, S: StepSource<T>> fmt::Debug for PdController<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdController")
            .field("kp", &self.kp)
            .field("kd", &self.kd)
            .field("stability_band", &self.stability_band)
            .field("last_dt", &self.last_dt)
            .field("last_input", &self.last_input)
            .field("last_input_kind", &self.last_input_kind)
            .field("derivative", &self.derivative)
            .finish_non_exhaustive()
    }
}

/// Diagnostic information about PD behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct PdDiagnostics<T: Float> {
    /// Total number of evaluations
    pub update_count: u64,
    /// Evaluations whose `dt` was replaced by the nominal step
    pub dt_substitutions: u64,
    /// Fraction of evaluations with a substituted `dt`
    pub substitution_ratio: T,
    /// Times consecutive evaluations used different derivative sources
    pub source_switches: u64,
    pub derivative: T,
    pub last_input: T,
    pub last_input_kind: LastInputKind,
    pub last_dt: T,
}

impl<T: Float + fmt::Display> fmt::Display for PdDiagnostics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PD Diagnostics:\n\
             Updates: {}\n\
             Substituted dt: {} ({:.2}%)\n\
             Source switches: {}\n\
             Derivative: {}\n\
             Last input: {} ({:?})\n\
             Last dt: {}",
            self.update_count,
            self.dt_substitutions,
            self.substitution_ratio * T::from(100.0).unwrap_or_else(T::one),
            self.source_switches,
            self.derivative,
            self.last_input,
            self.last_input_kind,
            self.last_dt
        )
    }
}
