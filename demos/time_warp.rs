//! Altitude hold through a simulation pause and a time-warp burst
//! Run with: cargo run --example time_warp

use std::cell::Cell;

use bumpless_pd::PdBuilder;

fn main() {
    println!("=== Time Warp ===\n");

    // Host physics step; the host may reconfigure it mid-flight
    let physics_step = Cell::new(0.02_f64);

    let mut pd = PdBuilder::new()
        .gains(0.8, 1.5)
        .build(|| physics_step.get())
        .unwrap();

    let mut altitude = 950.0;
    let mut climb_rate = 0.0;
    let target = 1000.0;
    let mut time = 0.0;

    println!("Time(s) | dt     | Alt(m)   | Thrust  | d-term  | Substituted");
    println!("--------|--------|----------|---------|---------|------------");

    for i in 0..1500 {
        let dt = match i {
            300..=349 => 0.0, // paused
            350 => 2.5,
            700..=799 => 0.1, // 5x warp
            _ => physics_step.get(),
        };
        if i == 1000 {
            physics_step.set(0.01);
            println!(">> Host physics step changed to 10 ms");
        }

        let output = pd.update_with_derivative(altitude, climb_rate, target, dt);

        let thrust = output.output.clamp(-20.0, 20.0);
        climb_rate += (thrust - climb_rate * 0.3) * dt;
        altitude += climb_rate * dt;
        time += dt;

        if (output.dt_substituted && i % 10 == 0) || i % 100 == 0 {
            println!(
                "{:7.2} | {:6.3} | {:8.2} | {:7.2} | {:7.2} | {}",
                time, dt, altitude, thrust, output.d, output.dt_substituted
            );
        }
    }

    println!("\n{}", pd.diagnostics());
}
