//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each
//! step pops the next event from [SimulationClock], inserts it as
//! [CurrentEvent], then runs the schedule. Systems are gated per event kind,
//! so only the relevant ones do work.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::ecs::Rider;
use crate::scenario::SimulationEndTime;
use crate::systems::{
    dispatch::{cancel_sweep_system, match_window_system},
    movement::movement_system,
    simulation_started::simulation_started_system,
    spawner::{driver_spawner_system, rider_spawner_system},
    traffic::traffic_update_system,
};
use crate::telemetry::{EventLog, SimEvent};

fn is_simulation_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SimulationStarted)
        .unwrap_or(false)
}

fn is_traffic_update(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TrafficUpdate)
        .unwrap_or(false)
}

fn is_spawn_driver(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SpawnDriver)
        .unwrap_or(false)
}

fn is_spawn_rider(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SpawnRider)
        .unwrap_or(false)
}

fn is_cancel_sweep(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::CancelSweep)
        .unwrap_or(false)
}

fn is_match_window(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::MatchWindow)
        .unwrap_or(false)
}

fn is_move_step(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::MoveStep)
        .unwrap_or(false)
}

/// Runs one simulation step: pops the next event, inserts it as
/// [CurrentEvent], then runs the schedule. Returns `false` when the clock is
/// empty or the next event is at or past [SimulationEndTime].
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let stop_at = world.get_resource::<SimulationEndTime>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end_ms), Some(ts)) = (stop_at, next_ts) {
        if ts >= end_ms {
            return false;
        }
    }

    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let stop_at = world.get_resource::<SimulationEndTime>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end_ms), Some(ts)) = (stop_at, next_ts) {
        if ts >= end_ms {
            return false;
        }
    }

    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs steps until the queue drains or `max_steps` is reached. Returns the
/// number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs steps until empty and invokes `hook` after each step.
pub fn run_until_empty_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    max_steps: usize,
    mut hook: F,
) -> usize
where
    F: FnMut(&World, &Event),
{
    let mut steps = 0;
    while steps < max_steps && run_next_event_with_hook(world, schedule, &mut hook) {
        steps += 1;
    }
    steps
}

/// Builds the default schedule: every event-reacting system, gated by event
/// kind, plus [apply_deferred] so spawned entities are visible next step.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            simulation_started_system.run_if(is_simulation_started),
            traffic_update_system.run_if(is_traffic_update),
            driver_spawner_system.run_if(is_spawn_driver),
            rider_spawner_system.run_if(is_spawn_rider),
            cancel_sweep_system.run_if(is_cancel_sweep),
            match_window_system.run_if(is_match_window),
            movement_system.run_if(is_move_step),
            apply_deferred,
        )
            .chain(),
    );
    schedule
}

/// Schedules the SimulationStarted event at time 0. Call after
/// [crate::scenario::build_scenario] and before running events.
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.schedule_at(0, EventKind::SimulationStarted);
}

/// Graceful shutdown: still-idle riders are force-finalised to Cancelled;
/// drivers in motion are left as they stand for the stats roll-up.
pub fn finalize_simulation(world: &mut World) {
    let now = world.resource::<SimulationClock>().now();
    let mut cancelled = Vec::new();
    let mut riders = world.query::<&mut Rider>();
    for mut rider in riders.iter_mut(world) {
        if rider.matched_time.is_none() && rider.cancelled_time.is_none() {
            rider.cancel(now);
            cancelled.push(rider.id);
        }
    }
    let mut log = world.resource_mut::<EventLog>();
    for rider in cancelled {
        log.record(now, SimEvent::RiderCancelled { rider });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{build_scenario, SimulationParams};
    use crate::test_helpers::shortcut_description;

    #[test]
    fn run_stops_at_the_end_time() {
        let mut world = World::new();
        build_scenario(
            &mut world,
            &shortcut_description(),
            SimulationParams::default().with_seed(3).with_end_time_secs(5),
        )
        .expect("scenario");
        initialize_simulation(&mut world);
        let mut schedule = simulation_schedule();
        run_until_empty(&mut world, &mut schedule, 1_000_000);
        assert!(world.resource::<SimulationClock>().now() < 5_000);
        // The queue still holds future events past the cut-off.
        assert!(!world.resource::<SimulationClock>().is_empty());
    }

    #[test]
    fn finalize_cancels_unmatched_riders() {
        let mut world = World::new();
        build_scenario(
            &mut world,
            &shortcut_description(),
            SimulationParams::default().with_seed(3).with_end_time_secs(5),
        )
        .expect("scenario");
        initialize_simulation(&mut world);
        let mut schedule = simulation_schedule();
        run_until_empty(&mut world, &mut schedule, 1_000_000);

        finalize_simulation(&mut world);
        let mut riders = world.query::<&Rider>();
        for rider in riders.iter(&world) {
            assert!(rider.matched_time.is_some() || rider.cancelled_time.is_some());
        }
    }
}
