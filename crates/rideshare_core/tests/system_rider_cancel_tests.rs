//! Cancellation sweep: unmatched riders expire on deadline, matched riders
//! never do.

mod support;

use rideshare_core::clock::EventKind;
use rideshare_core::ecs::{Rider, RiderState, RIDER_CANCEL_DELAY_MS};
use rideshare_core::graph::GraphDescription;
use rideshare_core::runner::simulation_schedule;
use rideshare_core::telemetry::{EventLog, SimEvent};
use support::world::{build_test_world, run_until, schedule_event, spawn_driver, spawn_rider};

fn pair_description() -> GraphDescription {
    let mut d = GraphDescription::default();
    d.add_node(0, 0.0, 0.0, false, false);
    d.add_node(1, 5.0, 0.0, false, false);
    d.add_node(2, 9.0, 0.0, false, false);
    d.add_edge(0, 1, 5.0, 1.0);
    d.add_edge(1, 2, 4.0, 1.0);
    d
}

#[test]
fn unmatched_rider_cancels_at_the_first_tick_past_deadline() {
    let mut world = build_test_world(&pair_description(), 9, 0);
    let rider_entity = spawn_rider(&mut world, 0, 2, 1);

    // Sweeps run every 132 ms from t = 132 on.
    schedule_event(&mut world, 132, EventKind::CancelSweep);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, RIDER_CANCEL_DELAY_MS + 1_000);

    let rider = world.entity(rider_entity).get::<Rider>().expect("rider");
    assert_eq!(rider.state, RiderState::Cancelled);
    let cancelled = rider.cancelled_time.expect("cancelled");
    assert!(cancelled >= RIDER_CANCEL_DELAY_MS);
    assert!(cancelled < RIDER_CANCEL_DELAY_MS + 132);
    assert_eq!(
        world
            .resource::<EventLog>()
            .count(|e| matches!(e, SimEvent::RiderCancelled { .. })),
        1
    );
}

#[test]
fn matched_rider_survives_its_deadline() {
    let mut world = build_test_world(&pair_description(), 9, 0);
    let driver_entity = spawn_driver(&mut world, 0, 2, 4);
    let rider_entity = spawn_rider(&mut world, 1, 2, 1);

    // Match first, then sweep well past the deadline. No movement runs, so
    // the rider stays matched-but-unboarded the whole time.
    schedule_event(&mut world, 10, EventKind::MatchWindow);
    schedule_event(&mut world, 132, EventKind::CancelSweep);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, RIDER_CANCEL_DELAY_MS + 1_000);

    let rider = world.entity(rider_entity).get::<Rider>().expect("rider");
    assert_eq!(rider.state, RiderState::Matched);
    assert_eq!(rider.driver, Some(driver_entity));
    assert_eq!(rider.cancelled_time, None);
    assert_eq!(
        world
            .resource::<EventLog>()
            .count(|e| matches!(e, SimEvent::RiderCancelled { .. })),
        0
    );
}

#[test]
fn sweep_before_window_beats_a_same_tick_match() {
    let mut world = build_test_world(&pair_description(), 9, 0);
    spawn_driver(&mut world, 0, 2, 4);
    let rider_entity = spawn_rider(&mut world, 1, 2, 1);

    // Both phases land exactly on the deadline tick; the sweep's phase
    // order wins and the window must not resurrect the rider.
    schedule_event(&mut world, RIDER_CANCEL_DELAY_MS, EventKind::CancelSweep);
    schedule_event(&mut world, RIDER_CANCEL_DELAY_MS, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, RIDER_CANCEL_DELAY_MS + 100);

    let rider = world.entity(rider_entity).get::<Rider>().expect("rider");
    assert_eq!(rider.state, RiderState::Cancelled);
    assert_eq!(rider.driver, None);
}
