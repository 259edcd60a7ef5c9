//! Reacts to SimulationStarted: primes the generators, the traffic cycle,
//! and the recurring tick phases.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::scenario::{TickConfig, TrafficConfig};

pub fn simulation_started_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    tick: Res<TickConfig>,
    traffic: Res<TrafficConfig>,
) {
    if event.0.kind != EventKind::SimulationStarted {
        return;
    }

    // Generators fire immediately and then pace themselves.
    clock.schedule_in(0, EventKind::SpawnDriver);
    clock.schedule_in(0, EventKind::SpawnRider);
    clock.schedule_in(traffic.period_ms, EventKind::TrafficUpdate);

    // Per-tick phases; each system reschedules its own successor.
    let tick_ms = tick.tick_ms();
    clock.schedule_in(tick_ms, EventKind::CancelSweep);
    clock.schedule_in(tick_ms, EventKind::MatchWindow);
    clock.schedule_in(tick_ms, EventKind::MoveStep);
}
