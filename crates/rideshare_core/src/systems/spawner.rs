//! Spawner systems: react to spawn events and create riders and drivers.
//!
//! Every spawn derives its own RNG from the generator seed plus the spawn
//! counter, so entity streams replay identically under a fixed seed
//! regardless of what else happened in the tick.

use bevy_ecs::prelude::{Commands, Res, ResMut};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::ecs::{Driver, IdAllocator, Rider};
use crate::graph::RoadGraph;
use crate::spawner::{
    driver_seats, interarrival_ms, rider_party, trip_endpoints, DriverSpawner, GeneratorConfig,
    NodePools, RiderSpawner,
};
use crate::telemetry::{EventLog, SimEvent, SimTelemetry};

/// Offset separating the driver stream from the rider stream under one
/// generator seed.
const DRIVER_STREAM: u64 = 0xDEAD_BEEF;

pub fn rider_spawner_system(
    mut commands: Commands,
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    config: Res<GeneratorConfig>,
    pools: Res<NodePools>,
    graph: Res<RoadGraph>,
    mut spawner: ResMut<RiderSpawner>,
    mut ids: ResMut<IdAllocator>,
    mut log: ResMut<EventLog>,
    mut telemetry: ResMut<SimTelemetry>,
) {
    if event.0.kind != EventKind::SpawnRider {
        return;
    }
    let now = clock.now();
    let day = clock.day_time();
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(spawner.spawned));
    spawner.spawned += 1;

    if let Some((start, end)) = trip_endpoints(&pools, day, &config, &mut rng) {
        let baseline = graph.dist(start, end);
        if baseline.is_finite() {
            let id = ids.allocate();
            let party = rider_party(&mut rng);
            commands.spawn(Rider::new(id, start, end, now, party, baseline));
            log.record(now, SimEvent::NewRider { rider: id });
        } else {
            telemetry.disconnected_spawns += 1;
        }
    }

    let delay = interarrival_ms(config.rider_interarrival_secs, day, &config, &mut rng);
    clock.schedule_in(delay, EventKind::SpawnRider);
}

pub fn driver_spawner_system(
    mut commands: Commands,
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    config: Res<GeneratorConfig>,
    pools: Res<NodePools>,
    graph: Res<RoadGraph>,
    mut spawner: ResMut<DriverSpawner>,
    mut ids: ResMut<IdAllocator>,
    mut log: ResMut<EventLog>,
    mut telemetry: ResMut<SimTelemetry>,
) {
    if event.0.kind != EventKind::SpawnDriver {
        return;
    }
    let now = clock.now();
    let day = clock.day_time();
    let mut rng =
        StdRng::seed_from_u64(config.seed.wrapping_add(DRIVER_STREAM).wrapping_add(spawner.spawned));
    spawner.spawned += 1;

    if let Some((start, end)) = trip_endpoints(&pools, day, &config, &mut rng) {
        let seats = driver_seats(&mut rng);
        let id = ids.allocate();
        match Driver::new(id, start, end, now, seats, &graph) {
            Some(driver) => {
                commands.spawn(driver);
                log.record(now, SimEvent::NewDriver { driver: id });
            }
            None => telemetry.disconnected_spawns += 1,
        }
    }

    let delay = interarrival_ms(config.driver_interarrival_secs, day, &config, &mut rng);
    clock.schedule_in(delay, EventKind::SpawnDriver);
}
