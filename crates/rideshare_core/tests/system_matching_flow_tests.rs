//! Match-window flow: beneficial matches commit with the right prices,
//! infeasible detours and contention are resolved, and conservation holds.

mod support;

use rideshare_core::clock::EventKind;
use rideshare_core::ecs::{Driver, Rider, RiderState};
use rideshare_core::graph::{GraphDescription, RoadGraph};
use rideshare_core::runner::simulation_schedule;
use rideshare_core::telemetry::{EventLog, SimEvent};
use support::world::{build_test_world, run_until, schedule_event, spawn_driver, spawn_rider};

const TOLERANCE: f64 = 1e-6;

/// Chain S-A-B-C-D-E with an A-E shortcut:
///
/// ```text
/// S(0) -1- A(1) -2- B(2) -3- C(3) -3- D(4) -2- E(5)
///           \__________9.5________________/
/// ```
///
/// A driver S->E departs on the S-A edge (so its match position is A) and
/// then normally takes the 9.5 shortcut.
fn flow_description() -> GraphDescription {
    let mut d = GraphDescription::default();
    for (id, x) in [(0, 0.0), (1, 1.0), (2, 3.0), (3, 6.0), (4, 9.0), (5, 11.0)] {
        d.add_node(id, x, 0.0, false, false);
    }
    d.add_edge(0, 1, 1.0, 1.0);
    d.add_edge(1, 2, 2.0, 1.0);
    d.add_edge(2, 3, 3.0, 1.0);
    d.add_edge(3, 4, 3.0, 1.0);
    d.add_edge(4, 5, 2.0, 1.0);
    d.add_edge(1, 5, 9.5, 1.0);
    d
}

#[test]
fn beneficial_match_commits_with_split_fares() {
    let mut world = build_test_world(&flow_description(), 42, 0);
    let driver_entity = spawn_driver(&mut world, 0, 5, 4);
    let rider_entity = spawn_rider(&mut world, 2, 4, 1);

    schedule_event(&mut world, 10, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, 20);

    let rider = world.entity(rider_entity).get::<Rider>().expect("rider");
    let driver = world.entity(driver_entity).get::<Driver>().expect("driver");

    // Driver baseline 10.5s, rider baseline 6s, joint route from A is
    // A-B-D-E = 10s on top of the 1s already under way: savings 5.5s.
    assert_eq!(rider.state, RiderState::Matched);
    assert_eq!(rider.driver, Some(driver_entity));
    assert_eq!(rider.matched_time, Some(10));
    assert!((driver.current_cost - 7_750.0).abs() < TOLERANCE);
    assert!((rider.current_cost - 3_250.0).abs() < TOLERANCE);
    assert!(rider.current_cost <= rider.baseline_cost);
    assert_eq!(driver.vacancies, 3);
    assert_eq!(driver.riders, vec![rider_entity]);

    // Conservation: both fares together pay for the whole remaining trip.
    let total = driver.current_cost + rider.current_cost;
    assert!((total - (1_000.0 + 10_000.0)).abs() < TOLERANCE);

    let log = world.resource::<EventLog>();
    assert_eq!(
        log.count(|e| matches!(e, SimEvent::RiderMatch { .. })),
        1
    );
}

#[test]
fn infeasible_detour_commits_nothing() {
    let mut world = build_test_world(&flow_description(), 42, 0);
    let driver_entity = spawn_driver(&mut world, 0, 5, 4);
    // Reverse-direction rider: the detour already exceeds the driver's
    // remaining solo distance, so the pre-filter drops it.
    let rider_entity = spawn_rider(&mut world, 3, 2, 1);

    schedule_event(&mut world, 10, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, 20);

    let rider = world.entity(rider_entity).get::<Rider>().expect("rider");
    let driver = world.entity(driver_entity).get::<Driver>().expect("driver");
    assert_eq!(rider.state, RiderState::Idle);
    assert_eq!(rider.driver, None);
    assert!(driver.riders.is_empty());
    assert_eq!(
        world
            .resource::<EventLog>()
            .count(|e| matches!(e, SimEvent::RiderMatch { .. })),
        0
    );
}

#[test]
fn capacity_contention_prefers_the_higher_savings_rider() {
    let mut world = build_test_world(&flow_description(), 42, 0);
    let driver_entity = spawn_driver(&mut world, 0, 5, 1);
    // B->D saves 5.5s, B->C saves 2.5s; one seat takes the former.
    let long_rider = spawn_rider(&mut world, 2, 4, 1);
    let short_rider = spawn_rider(&mut world, 2, 3, 1);

    schedule_event(&mut world, 10, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, 20);

    let winner = world.entity(long_rider).get::<Rider>().expect("rider");
    let loser = world.entity(short_rider).get::<Rider>().expect("rider");
    let driver = world.entity(driver_entity).get::<Driver>().expect("driver");
    assert_eq!(winner.state, RiderState::Matched);
    assert_eq!(loser.state, RiderState::Idle);
    assert_eq!(driver.vacancies, 0);
    assert_eq!(driver.riders, vec![long_rider]);
}

#[test]
fn contending_drivers_resolve_by_savings() {
    let mut world = build_test_world(&flow_description(), 42, 0);
    // S->E saves 2.5s on this rider; S->D saves 3s and must win.
    let through_driver = spawn_driver(&mut world, 0, 5, 4);
    let local_driver = spawn_driver(&mut world, 0, 4, 4);
    let rider_entity = spawn_rider(&mut world, 2, 3, 1);

    schedule_event(&mut world, 10, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, 20);

    let rider = world.entity(rider_entity).get::<Rider>().expect("rider");
    assert_eq!(rider.driver, Some(local_driver));

    let loser = world.entity(through_driver).get::<Driver>().expect("driver");
    assert!(loser.riders.is_empty());
    assert_eq!(loser.vacancies, 4);
    assert!((loser.current_cost - loser.baseline_cost).abs() < TOLERANCE);
}

#[test]
fn batch_of_two_riders_shares_half_the_savings_proportionally() {
    let mut world = build_test_world(&flow_description(), 42, 0);
    let driver_entity = spawn_driver(&mut world, 0, 5, 4);
    let first = spawn_rider(&mut world, 2, 3, 1);
    let second = spawn_rider(&mut world, 2, 3, 1);

    schedule_event(&mut world, 10, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, 20);

    let driver = world.entity(driver_entity).get::<Driver>().expect("driver");
    let rider_a = world.entity(first).get::<Rider>().expect("rider");
    let rider_b = world.entity(second).get::<Rider>().expect("rider");

    // Joint route A-B-C-E costs 10s; savings 10.5 + 3 + 3 - 11 = 5.5s.
    assert_eq!(driver.riders.len(), 2);
    assert!((driver.current_cost - (10_500.0 - 2_750.0)).abs() < TOLERANCE);
    // Equal baselines split the rider half evenly.
    assert!((rider_a.current_cost - 1_625.0).abs() < TOLERANCE);
    assert!((rider_b.current_cost - 1_625.0).abs() < TOLERANCE);

    let total = driver.current_cost + rider_a.current_cost + rider_b.current_cost;
    assert!((total - (1_000.0 + 10_000.0)).abs() < TOLERANCE);
}

#[test]
fn second_window_extends_an_already_shared_route() {
    let mut world = build_test_world(&flow_description(), 42, 0);
    let driver_entity = spawn_driver(&mut world, 0, 5, 4);
    let first = spawn_rider(&mut world, 2, 4, 1);

    schedule_event(&mut world, 10, EventKind::MatchWindow);
    let mut schedule = simulation_schedule();
    run_until(&mut world, &mut schedule, 20);
    let cost_after_first = world
        .entity(driver_entity)
        .get::<Driver>()
        .expect("driver")
        .current_cost;

    // A second rider arrives before the driver moves; the next window must
    // keep the first rider's stops and only ever lower the driver's cost.
    let second = spawn_rider(&mut world, 2, 3, 1);
    run_until(&mut world, &mut schedule, 160);

    let driver = world.entity(driver_entity).get::<Driver>().expect("driver");
    let graph = world.resource::<RoadGraph>();
    assert!(driver.current_cost <= cost_after_first + TOLERANCE);
    if world.entity(second).get::<Rider>().expect("rider").state == RiderState::Matched {
        assert_eq!(driver.riders.len(), 2);
    }
    // The installed walk still serves the first rider in pickup order.
    let mut nodes: Vec<usize> = vec![];
    if let Some(head) = driver.current_edge {
        nodes.push(graph.edge(head.edge).to);
    }
    nodes.extend(driver.route.iter().map(|&e| graph.edge(e).to));
    let first_rider = world.entity(first).get::<Rider>().expect("rider");
    let pickup = nodes.iter().position(|&n| n == first_rider.start_node);
    let dropoff = nodes.iter().rposition(|&n| n == first_rider.end_node);
    assert!(pickup.expect("pickup on route") < dropoff.expect("dropoff on route"));
}
