//! Movement system: advances every active driver along its edge walk.
//!
//! Each tick a driver covers `speed x dt` metres on its current edge,
//! crossing as many nodes as the budget allows. Crossing a node boards
//! matched riders whose pickup it is, completes boarded riders whose
//! dropoff it is, and completes the driver once the walk is exhausted at
//! its terminal.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::ecs::{Driver, DriverState, EdgeProgress, Rider, RiderState};
use crate::graph::RoadGraph;
use crate::scenario::TickConfig;
use crate::telemetry::{EventLog, SimEvent, SimTelemetry};

pub fn movement_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    tick: Res<TickConfig>,
    graph: Res<RoadGraph>,
    mut drivers: Query<&mut Driver>,
    mut riders: Query<&mut Rider>,
    mut log: ResMut<EventLog>,
    mut telemetry: ResMut<SimTelemetry>,
) {
    if event.0.kind != EventKind::MoveStep {
        return;
    }
    let now = clock.now();
    let dt_secs = tick.tick_ms() as f64 / 1000.0;
    if dt_secs <= 0.0 {
        telemetry.clock_skew_clamps += 1;
        clock.schedule_in(tick.tick_ms().max(1), EventKind::MoveStep);
        return;
    }

    for mut driver in &mut drivers {
        if driver.state != DriverState::Driving {
            continue;
        }
        let mut time_left = dt_secs;
        while time_left > 0.0 {
            let Some(progress) = driver.current_edge else {
                break;
            };
            let edge = *graph.edge(progress.edge);
            let remaining = (edge.distance - progress.traveled).max(0.0);
            let step = edge.speed * time_left;
            if step < remaining {
                driver.current_edge = Some(EdgeProgress {
                    edge: progress.edge,
                    traveled: progress.traveled + step,
                });
                driver.total_distance += step;
                break;
            }

            // Cross the edge's ending node.
            time_left -= remaining / edge.speed;
            driver.total_distance += remaining;
            driver.progress_cost += edge.travel_time_ms() as f64;
            let node = edge.to;

            let assigned: Vec<_> = driver.riders.clone();
            for rider_entity in assigned {
                let Ok(mut rider) = riders.get_mut(rider_entity) else {
                    continue;
                };
                if rider.state == RiderState::Matched && rider.start_node == node {
                    rider.board(now);
                    log.record(
                        now,
                        SimEvent::RiderPickup {
                            driver: driver.id,
                            rider: rider.id,
                        },
                    );
                } else if rider.state == RiderState::Boarded && rider.end_node == node {
                    rider.complete(now);
                    driver.vacancies += rider.passenger_count;
                    driver.riders.retain(|&e| e != rider_entity);
                    driver.completed_riders.push(rider_entity);
                    log.record(
                        now,
                        SimEvent::RiderDropOff {
                            driver: driver.id,
                            rider: rider.id,
                        },
                    );
                }
            }

            match driver.route.pop_front() {
                Some(next) => {
                    driver.current_edge = Some(EdgeProgress {
                        edge: next,
                        traveled: 0.0,
                    });
                }
                None => {
                    debug_assert_eq!(node, driver.end_node, "route must end at the terminal");
                    driver.complete(now);
                    log.record(now, SimEvent::DriverComplete { driver: driver.id });
                }
            }
        }
    }

    clock.schedule_in(tick.tick_ms(), EventKind::MoveStep);
}
