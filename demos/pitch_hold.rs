//! Aircraft pitch hold with a gyro-supplied pitch rate
//! Run with: cargo run --example pitch_hold

use bumpless_pd::{FixedStep, PdBuilder, PdController};

fn main() {
    println!("=== Pitch Hold ===\n");

    let mut pd = create_pitch_controller();

    let mut pitch = 0.0;
    let mut pitch_rate = 0.0;
    let mut target = 0.0;
    let dt = 0.02; // 50 Hz physics

    println!("Time(s) | Pitch(°) | Target(°) | Elevator | P       | D");
    println!("--------|----------|-----------|----------|---------|--------");

    for i in 0..750 {
        let time = i as f64 * dt;

        if i == 100 {
            target = 10.0;
            println!(">> Climb attitude");
        }
        if i == 400 {
            target = 5.0;
            println!(">> Leveling off");
        }

        // Gust every two seconds
        let gust = if i % 100 == 50 { (time * 3.0).sin() * 2.0 } else { 0.0 };

        let output = pd.update_with_derivative(pitch, pitch_rate, target, dt);

        let elevator = output.output.clamp(-25.0, 25.0);
        let pitch_acceleration = elevator * 0.8 - pitch_rate * 0.1 + gust;
        pitch_rate += pitch_acceleration * dt;
        pitch += pitch_rate * dt;

        if i % 25 == 0 {
            println!(
                "{:7.2} | {:8.2} | {:9.2} | {:8.2} | {:7.2} | {:7.2}",
                time, pitch, target, elevator, output.p, output.d
            );
        }
    }

    println!("\n{}", pd.diagnostics());
}

fn create_pitch_controller() -> PdController<f64, FixedStep<f64>> {
    PdBuilder::new()
        .gains(3.5, 2.4)
        .initial_dt(0.02)
        .build(FixedStep(0.02))
        .unwrap()
}
