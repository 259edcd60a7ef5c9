#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, Schedule, World};
use rideshare_core::clock::{EventKind, SimulationClock};
use rideshare_core::ecs::{Driver, IdAllocator, Rider};
use rideshare_core::graph::{GraphDescription, RoadGraph};
use rideshare_core::runner::run_until_empty;
use rideshare_core::scenario::{build_scenario, SimulationEndTime, SimulationParams};

/// Build a fully-wired world over `description` without scheduling
/// SimulationStarted, so tests drive exactly the events they care about.
pub fn build_test_world(description: &GraphDescription, seed: u64, epoch_ms: u64) -> World {
    let mut world = World::new();
    build_scenario(
        &mut world,
        description,
        SimulationParams::default()
            .with_seed(seed)
            .with_epoch_ms(epoch_ms),
    )
    .expect("test scenario");
    world
}

/// Spawn a driver already driving its solo route.
pub fn spawn_driver(world: &mut World, start: usize, end: usize, seats: u32) -> Entity {
    let now = world.resource::<SimulationClock>().now();
    let id = world.resource_mut::<IdAllocator>().allocate();
    let driver = {
        let graph = world.resource::<RoadGraph>();
        Driver::new(id, start, end, now, seats, graph).expect("connected driver endpoints")
    };
    world.spawn(driver).id()
}

/// Spawn an idle rider paying its solo baseline.
pub fn spawn_rider(world: &mut World, start: usize, end: usize, party: u32) -> Entity {
    let now = world.resource::<SimulationClock>().now();
    let id = world.resource_mut::<IdAllocator>().allocate();
    let baseline = world.resource::<RoadGraph>().dist(start, end);
    assert!(baseline.is_finite(), "rider endpoints must be connected");
    world
        .spawn(Rider::new(id, start, end, now, party, baseline))
        .id()
}

pub fn schedule_event(world: &mut World, at_ms: u64, kind: EventKind) {
    world
        .resource_mut::<SimulationClock>()
        .schedule_at(at_ms, kind);
}

/// Run until the queue drains or the next event reaches `end_ms`.
/// Self-rescheduling tick systems keep the queue alive, so the end time is
/// what actually stops the run.
pub fn run_until(world: &mut World, schedule: &mut Schedule, end_ms: u64) -> usize {
    world.insert_resource(SimulationEndTime(end_ms));
    run_until_empty(world, schedule, 1_000_000)
}
