//! Dispatch-tick systems: the cancellation sweep and the match window.
//!
//! Both fire once per tick; the clock's same-timestamp ordering guarantees
//! the sweep runs first, so the window never sees an expired rider. The
//! window freezes rider and driver snapshots, hands them to the configured
//! matching algorithm, and applies the returned assignments to the world.

use bevy_ecs::prelude::{Entity, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::ecs::{remaining_stop_pairs, Driver, DriverState, Rider, RiderState};
use crate::graph::RoadGraph;
use crate::matching::{DriverBrief, MatchingAlgorithmResource, RiderSnapshot};
use crate::scenario::{MasterSeed, MatchWindowCounter, TickConfig};
use crate::telemetry::{EventLog, SimEvent};

/// Cancel riders whose deadline passed while still unmatched.
pub fn cancel_sweep_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    tick: Res<TickConfig>,
    mut riders: Query<&mut Rider>,
    mut log: ResMut<EventLog>,
) {
    if event.0.kind != EventKind::CancelSweep {
        return;
    }
    let now = clock.now();
    for mut rider in &mut riders {
        if rider.should_cancel(now) {
            rider.cancel(now);
            log.record(now, SimEvent::RiderCancelled { rider: rider.id });
        }
    }
    clock.schedule_in(tick.tick_ms(), EventKind::CancelSweep);
}

/// Run the configured matching algorithm over the current idle riders and
/// receptive drivers, then commit its assignments.
pub fn match_window_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    tick: Res<TickConfig>,
    graph: Res<RoadGraph>,
    algorithm: Res<MatchingAlgorithmResource>,
    seed: Res<MasterSeed>,
    mut window: ResMut<MatchWindowCounter>,
    mut drivers: Query<(Entity, &mut Driver)>,
    mut riders: Query<(Entity, &mut Rider)>,
    mut log: ResMut<EventLog>,
) {
    if event.0.kind != EventKind::MatchWindow {
        return;
    }
    let now = clock.now();

    let mut rider_snapshots: Vec<RiderSnapshot> = riders
        .iter()
        .filter(|(_, rider)| rider.state == RiderState::Idle)
        .map(|(entity, rider)| RiderSnapshot {
            entity,
            id: rider.id,
            start_node: rider.start_node,
            end_node: rider.end_node,
            passenger_count: rider.passenger_count,
            paid: rider.current_cost,
        })
        .collect();
    rider_snapshots.sort_by_key(|snapshot| snapshot.id);

    let mut briefs: Vec<DriverBrief> = Vec::new();
    for (entity, driver) in drivers.iter() {
        if driver.state != DriverState::Driving || driver.vacancies == 0 {
            continue;
        }
        let Some(position) = driver.heading_node(&graph) else {
            continue;
        };
        if position == driver.end_node {
            continue;
        }
        let assigned: Vec<&Rider> = driver
            .riders
            .iter()
            .filter_map(|&e| riders.get(e).ok().map(|(_, rider)| rider))
            .collect();
        let served_paid: f64 = assigned.iter().map(|rider| rider.current_cost).sum::<f64>()
            + driver
                .completed_riders
                .iter()
                .filter_map(|&e| riders.get(e).ok())
                .map(|(_, rider)| rider.current_cost)
                .sum::<f64>();
        briefs.push(DriverBrief {
            entity,
            id: driver.id,
            end_node: driver.end_node,
            vacancies: driver.vacancies,
            position,
            prior_cost: driver.prior_cost(&graph),
            current_cost: driver.current_cost,
            committed_pairs: remaining_stop_pairs(driver, assigned.into_iter()),
            served_paid,
        });
    }
    briefs.sort_by_key(|brief| brief.id);

    if !briefs.is_empty() && !rider_snapshots.is_empty() {
        let assignments =
            algorithm.propose(&graph, &briefs, &rider_snapshots, seed.0, window.0);
        for assignment in assignments {
            let Ok((_, mut driver)) = drivers.get_mut(assignment.driver) else {
                continue;
            };
            if !driver.install_route(&graph, &assignment.stops) {
                continue;
            }
            driver.current_cost = assignment.driver_cost;
            for &(rider_entity, cost) in &assignment.riders {
                let Ok((_, mut rider)) = riders.get_mut(rider_entity) else {
                    continue;
                };
                // Stale riders (cancelled or taken since the snapshot) are
                // dropped here rather than crashing the commit.
                if rider.state != RiderState::Idle {
                    continue;
                }
                rider.match_driver(assignment.driver, cost, now);
                driver.vacancies -= rider.passenger_count;
                driver.riders.push(rider_entity);
                log.record(
                    now,
                    SimEvent::RiderMatch {
                        driver: driver.id,
                        rider: rider.id,
                    },
                );
            }
        }
    }

    window.0 += 1;
    clock.schedule_in(tick.tick_ms(), EventKind::MatchWindow);
}
