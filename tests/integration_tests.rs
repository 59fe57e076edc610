use approx::assert_relative_eq;
use bumpless_pd::{DerivativeSource, FixedStep, LastInputKind, PdBuilder, PdController, StepSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;

const STEP: f64 = 0.02;

fn steady(kp: f64, kd: f64) -> PdController<f64, FixedStep<f64>> {
    PdBuilder::new()
        .gains(kp, kd)
        .initial_dt(STEP)
        .build(FixedStep(STEP))
        .unwrap()
}

#[test]
fn test_proportional_only_for_any_input() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut pd = PdController::with_gains(1.0, 0.0, FixedStep(STEP));

    for _ in 0..1000 {
        let kp = rng.gen_range(-50.0..50.0);
        let input = rng.gen_range(-1e4..1e4);
        let desire = rng.gen_range(-1e4..1e4);
        let dt = rng.gen_range(1e-4..10.0);

        pd.kp = kp;
        let output = pd.control(input, desire, dt);
        assert_eq!(output, (desire - input) * kp);
    }
}

#[test]
fn test_derivative_term_opposes_rising_input() {
    let mut pd = steady(1.0, 0.05);

    for i in 1..20 {
        let out = pd.update(i as f64 * 0.1, 0.0, STEP);
        assert!(!out.dt_substituted);
        assert!(out.d < 0.0, "tick {}: d = {}", i, out.d);
    }
}

#[test]
fn test_time_warp_jump_uses_nominal_step() {
    let mut pd = PdController::with_gains(1.0, 1.0, FixedStep(STEP));

    let out = pd.update(2.5, 1.0, 5.0);

    assert!(out.dt_substituted);
    assert_eq!(out.dt, STEP);
    assert_eq!(out.derivative, 0.0);
    assert_eq!(out.p, -1.5);
    assert_eq!(pd.last_dt(), STEP);
}

#[test]
fn test_stability_band_boundary() {
    let cases = [(1.0999, false), (0.9001, false), (1.11, true), (0.5, true)];
    for (dt, expect_substituted) in cases {
        let mut pd = PdController::with_gains(1.0, 1.0, FixedStep(STEP));
        let out = pd.update(0.0, 0.0, dt);
        assert_eq!(out.dt_substituted, expect_substituted, "dt = {}", dt);
    }
}

#[test]
fn test_band_follows_last_effective_dt() {
    let mut pd = PdController::with_gains(1.0, 1.0, FixedStep(STEP));

    // First call re-bases onto the nominal step, later calls are judged against it
    assert!(pd.update(0.0, 0.0, STEP).dt_substituted);
    assert!(!pd.update(0.0, 0.0, STEP * 1.05).dt_substituted);
    assert!(!pd.update(0.0, 0.0, STEP * 1.05 * 1.05).dt_substituted);
    assert!(pd.update(0.0, 0.0, STEP * 2.0).dt_substituted);
}

// Mixing operations on one instance diverges from estimated-only use. The supplied-derivative
// call leaves a raw input in `last_input` where the estimating call expects an error.
#[test]
fn test_mixed_operations_diverge_from_estimated_only() {
    let mut estimated_only = steady(1.0, 1.0);
    estimated_only.control(1.0, 0.0, STEP);
    estimated_only.control(2.0, 0.0, STEP);
    let third = estimated_only.update(3.0, 0.0, STEP);

    let mut mixed = steady(1.0, 1.0);
    mixed.control(1.0, 0.0, STEP);
    mixed.control_with_derivative(2.0, 0.0, 0.0, STEP);
    assert_eq!(mixed.last_input_kind(), LastInputKind::Input);
    let third_mixed = mixed.update(3.0, 0.0, STEP);

    // (3 - (0 - 2)) / 0.02 against (3 - 2) / 0.02
    assert_relative_eq!(third.derivative, 250.0, epsilon = 1e-9);
    assert_relative_eq!(third_mixed.derivative, 50.0, epsilon = 1e-9);
    assert!((third.derivative - third_mixed.derivative).abs() > 1.0);
    assert_eq!(mixed.diagnostics().source_switches, 2);
}

#[test]
fn test_estimated_derivative_differences_against_error() {
    let mut pd = steady(1.0, 1.0);
    pd.control(1.0, 4.0, STEP);
    assert_eq!(pd.last_input(), 3.0);
    assert_eq!(pd.last_input_kind(), LastInputKind::Error);

    let out = pd.update(1.0, 4.0, STEP);
    assert_relative_eq!(out.derivative, (1.0 - 3.0) / STEP, epsilon = 1e-9);
}

#[test]
fn test_degenerate_dt_never_reaches_divisor() {
    let mut pd = steady(1.0, 1.0);

    for dt in [0.0, -STEP, f64::NAN, f64::INFINITY, 1e9] {
        let out = pd.update(1.0, 2.0, dt);
        assert!(out.dt_substituted, "dt = {}", dt);
        assert_eq!(out.dt, STEP);
        assert!(out.output.is_finite());
    }
    assert_eq!(pd.diagnostics().dt_substitutions, 5);
}

#[test]
fn test_host_step_reconfiguration() {
    let host_step = Cell::new(STEP);
    let mut pd = PdBuilder::new()
        .gains(1.0, 1.0)
        .build(|| host_step.get())
        .unwrap();

    assert_eq!(pd.update(0.0, 0.0, 0.5).dt, STEP);

    host_step.set(0.01);
    assert_eq!(pd.step_source().nominal_step(), 0.01);
    assert_eq!(pd.update(0.0, 0.0, 0.5).dt, 0.01);
}

#[test]
fn test_borrowed_fixed_step_drives_controller() {
    let host_step = FixedStep(STEP);
    let mut pd = PdBuilder::new()
        .gains(1.0, 1.0)
        .build(&host_step)
        .unwrap();

    let out = pd.update(0.0, 0.0, 0.5);
    assert!(out.dt_substituted);
    assert_eq!(out.dt, STEP);
    assert_eq!(pd.step_source().nominal_step(), STEP);
}

#[test]
fn test_pause_and_warp_in_closed_loop() {
    // Double integrator driven with a supplied rate, as an attitude loop would be
    let mut pd = steady(4.0, 3.0);
    let mut angle = 0.0;
    let mut rate = 0.0;
    let target = 1.0;
    let mut peak_output: f64 = 0.0;

    for i in 0..2000 {
        let dt = match i {
            500..=520 => 0.0, // paused
            521 => 0.5,
            1000..=1010 => 0.2,
            _ => STEP,
        };

        let out = pd.update_with_derivative(angle, rate, target, dt);
        assert_eq!(out.source, DerivativeSource::Supplied);
        assert!(out.output.is_finite());
        peak_output = peak_output.max(out.output.abs());

        rate += out.output * dt;
        angle += rate * dt;
    }

    assert!(peak_output <= 4.0 + 1e-9);
    assert!((angle - target).abs() < 0.05, "angle = {}", angle);
    assert!(pd.diagnostics().dt_substitutions >= 4);
}

#[test]
fn test_single_precision() {
    let mut pd = PdBuilder::<f32>::new()
        .gains(2.0, 0.5)
        .initial_dt(0.02)
        .build(FixedStep(0.02f32))
        .unwrap();

    pd.rebase(1.0);
    let out = pd.update(1.5, 1.0, 0.02);
    assert_relative_eq!(out.p, -1.0);
    assert_relative_eq!(out.derivative, 25.0, epsilon = 1e-3);
    assert_relative_eq!(out.output, -13.5, epsilon = 1e-3);
}

#[test]
fn test_diagnostics_display() {
    let mut pd = steady(1.0, 1.0);
    pd.control(0.0, 1.0, STEP);
    pd.control(0.0, 1.0, 1.0);

    let text = pd.diagnostics().to_string();
    assert!(text.contains("Updates: 2"));
    assert!(text.contains("Substituted dt: 1 (50.00%)"));
}
