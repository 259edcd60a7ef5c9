//! Traffic system: resamples edge speeds and re-plans every active driver.
//!
//! The graph's tables are rebuilt here, in the ingestion phase of the tick,
//! while no matching workers are running; every later read in the tick sees
//! the new snapshot. Drivers re-plan from their current edge's ending node
//! over the union of on-board dropoffs and matched pickup/dropoff pairs, so
//! no rider loses its match.

use bevy_ecs::prelude::{Query, Res, ResMut};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::ecs::{remaining_stop_pairs, Driver, DriverState, Rider};
use crate::graph::RoadGraph;
use crate::routing::held_karp;
use crate::scenario::TrafficConfig;
use crate::telemetry::{EventLog, SimEvent, SimTelemetry};

pub fn traffic_update_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut config: ResMut<TrafficConfig>,
    mut graph: ResMut<RoadGraph>,
    mut drivers: Query<&mut Driver>,
    riders: Query<&Rider>,
    mut log: ResMut<EventLog>,
    mut telemetry: ResMut<SimTelemetry>,
) {
    if event.0.kind != EventKind::TrafficUpdate {
        return;
    }
    let now = clock.now();
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(config.updates));
    config.updates += 1;
    graph.update_traffic(clock.day_time(), &mut rng);
    log.record(now, SimEvent::TrafficUpdate);

    for mut driver in &mut drivers {
        if driver.state != DriverState::Driving {
            continue;
        }
        let Some(position) = driver.heading_node(&graph) else {
            continue;
        };
        let assigned = driver
            .riders
            .iter()
            .filter_map(|&entity| riders.get(entity).ok());
        let pairs = remaining_stop_pairs(&driver, assigned);
        let replanned = held_karp(&graph, position, driver.end_node, &pairs, f64::INFINITY)
            .is_ok_and(|route| driver.install_route(&graph, &route.stops));
        if !replanned {
            // The old edge walk is still valid in the graph; keep it.
            telemetry.replan_fallbacks += 1;
        }
        // Agreed fares are not reopened by congestion changes.
    }

    clock.schedule_in(config.period_ms, EventKind::TrafficUpdate);
}
