//! Run a seeded morning-rush scenario headlessly, stream the event log, and
//! print the statistics roll-up.
//!
//! Run with: cargo run -p rideshare_core --example scenario_run

use bevy_ecs::prelude::World;
use rideshare_core::clock::{format_day_time, ONE_HOUR_MS};
use rideshare_core::runner::{
    finalize_simulation, initialize_simulation, run_until_empty_with_hook, simulation_schedule,
};
use rideshare_core::scenario::{build_scenario, SimulationParams};
use rideshare_core::stats::{compile_report, write_csv};
use rideshare_core::telemetry::EventLog;
use rideshare_core::test_helpers::grid_description;

fn main() {
    const SEED: u64 = 123;
    const SIM_MINUTES: u64 = 10;

    let mut world = World::new();
    build_scenario(
        &mut world,
        &grid_description(6, 6, 2.0),
        SimulationParams::default()
            .with_seed(SEED)
            .with_epoch_ms(8 * ONE_HOUR_MS)
            .with_end_time_secs(SIM_MINUTES * 60),
    )
    .expect("scenario");
    initialize_simulation(&mut world);

    let mut schedule = simulation_schedule();
    let mut printed = 0usize;
    let steps = run_until_empty_with_hook(&mut world, &mut schedule, 5_000_000, |world, _| {
        let log = world.resource::<EventLog>();
        for record in &log.records[printed..] {
            let clock = world.resource::<rideshare_core::clock::SimulationClock>();
            println!(
                "[LOG] {}: {}",
                format_day_time(clock.day_time_at(record.at_ms)),
                record.event
            );
        }
        printed = log.records.len();
    });
    finalize_simulation(&mut world);

    let report = compile_report(&mut world);
    println!("--- {SIM_MINUTES} simulated minutes, seed {SEED}, {steps} events ---");
    println!("{report:#?}");

    let mut csv = Vec::new();
    write_csv(&report, &mut csv).expect("csv");
    println!("{}", String::from_utf8(csv).expect("utf8"));
}
