//! Outbound event bus and defensive counters.
//!
//! Systems append to [EventLog] as lifecycle transitions happen; the runner
//! exposes the records to callers through its per-event hook. Two runs with
//! the same seed produce identical logs, which is also how determinism is
//! asserted in tests.

use std::fmt;

use bevy_ecs::prelude::Resource;

/// Events the core emits, keyed by the entities' display ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    NewDriver { driver: u64 },
    NewRider { rider: u64 },
    RiderMatch { driver: u64, rider: u64 },
    RiderPickup { driver: u64, rider: u64 },
    RiderDropOff { driver: u64, rider: u64 },
    RiderCancelled { rider: u64 },
    DriverComplete { driver: u64 },
    TrafficUpdate,
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SimEvent::NewDriver { driver } => write!(f, "new-driver D{driver}"),
            SimEvent::NewRider { rider } => write!(f, "new-rider R{rider}"),
            SimEvent::RiderMatch { driver, rider } => write!(f, "rider-match D{driver} R{rider}"),
            SimEvent::RiderPickup { driver, rider } => {
                write!(f, "rider-pickup D{driver} R{rider}")
            }
            SimEvent::RiderDropOff { driver, rider } => {
                write!(f, "rider-drop-off D{driver} R{rider}")
            }
            SimEvent::RiderCancelled { rider } => write!(f, "rider-cancelled R{rider}"),
            SimEvent::DriverComplete { driver } => write!(f, "driver-complete D{driver}"),
            SimEvent::TrafficUpdate => write!(f, "traffic-update"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub at_ms: u64,
    pub event: SimEvent,
}

/// Chronological record of every emitted event.
#[derive(Debug, Default, Resource)]
pub struct EventLog {
    pub records: Vec<EventRecord>,
}

impl EventLog {
    pub fn record(&mut self, at_ms: u64, event: SimEvent) {
        self.records.push(EventRecord { at_ms, event });
    }

    pub fn count(&self, predicate: impl Fn(&SimEvent) -> bool) -> usize {
        self.records.iter().filter(|r| predicate(&r.event)).count()
    }
}

/// Defensive counters; all zero on a healthy run.
#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    /// Non-positive movement deltas clamped instead of applied.
    pub clock_skew_clamps: u64,
    /// Spawns dropped because the sampled endpoints were not connected.
    pub disconnected_spawns: u64,
    /// Traffic re-plans that kept the previous route after a kernel failure.
    pub replan_fallbacks: u64,
}
