//! Simulation time: millisecond timeline driven by a scheduled-event heap.
//!
//! All timestamps and `clock.now()` are in **simulation milliseconds**. The
//! timeline advances by popping the next scheduled event; events sharing a
//! timestamp pop in [EventKind] declaration order, which is how the phases of
//! a dispatch tick (ingestion, cancellation sweep, matching, movement) are
//! kept strictly ordered without a separate phase machine.
//!
//! Time 0 is mapped to a time-of-day via `epoch_ms`, so rush-hour and night
//! windows can be evaluated against the simulated day.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

/// One second in simulation milliseconds.
pub const ONE_SEC_MS: u64 = 1000;
/// One minute in simulation milliseconds.
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;
/// One hour in simulation milliseconds.
pub const ONE_HOUR_MS: u64 = 60 * ONE_MIN_MS;
/// One simulated day in milliseconds.
pub const ONE_DAY_MS: u64 = 24 * ONE_HOUR_MS;

/// Scheduled-event kinds. Variant order doubles as the phase order within a
/// tick: ingestion events (traffic, spawns) run before the cancellation
/// sweep, the sweep before the match window, the window before movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    SimulationStarted,
    TrafficUpdate,
    SpawnDriver,
    SpawnRider,
    CancelSweep,
    MatchWindow,
    MoveStep,
}

/// Simulation event. `timestamp` is in **milliseconds** (simulation time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by timestamp; same timestamp ordered by kind (phase order).
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Rush windows of the simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RushWindow {
    Morning,
    Evening,
}

/// Rush window containing `day_ms` (a time of day in ms), if any.
/// Morning is 07:00-10:00, evening 16:00-19:00, both inclusive.
pub fn rush_window(day_ms: u64) -> Option<RushWindow> {
    if (7 * ONE_HOUR_MS..=10 * ONE_HOUR_MS).contains(&day_ms) {
        Some(RushWindow::Morning)
    } else if (16 * ONE_HOUR_MS..=19 * ONE_HOUR_MS).contains(&day_ms) {
        Some(RushWindow::Evening)
    } else {
        None
    }
}

/// Whether `day_ms` falls in the night window (before 06:00).
pub fn is_night(day_ms: u64) -> bool {
    day_ms < 6 * ONE_HOUR_MS
}

/// Render a time of day as `HH:MM:SS` for logs.
pub fn format_day_time(day_ms: u64) -> String {
    let total_secs = day_ms / ONE_SEC_MS;
    let (hours, rem) = (total_secs / 3600, total_secs % 3600);
    format!("{:02}:{:02}:{:02}", hours, rem / 60, rem % 60)
}

/// Simulation clock: time in **milliseconds**, advances to the next scheduled
/// event. `epoch_ms` is the time-of-day (ms past midnight) that simulation
/// time 0 corresponds to.
#[derive(Debug, Clone, Resource, Default)]
pub struct SimulationClock {
    now: u64,
    epoch_ms: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    /// Clock whose time 0 maps to the given time-of-day offset (ms past midnight).
    pub fn with_epoch(epoch_ms: u64) -> Self {
        Self {
            now: 0,
            epoch_ms: epoch_ms % ONE_DAY_MS,
            events: BinaryHeap::new(),
        }
    }

    /// Current simulation time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Time-of-day offset that simulation time 0 maps to.
    pub fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    /// Current time of day in milliseconds past midnight.
    pub fn day_time(&self) -> u64 {
        (self.epoch_ms + self.now) % ONE_DAY_MS
    }

    /// Time of day (ms past midnight) for an arbitrary simulation timestamp.
    pub fn day_time_at(&self, sim_ms: u64) -> u64 {
        (self.epoch_ms + sim_ms) % ONE_DAY_MS
    }

    /// Schedule an event at a specific simulation timestamp (ms).
    pub fn schedule_at(&mut self, at_ms: u64, kind: EventKind) {
        self.schedule(Event {
            timestamp: at_ms,
            kind,
        });
    }

    /// Schedule an event at `now + delta_ms` (relative, in ms).
    pub fn schedule_in(&mut self, delta_ms: u64, kind: EventKind) {
        self.schedule_at(self.now.saturating_add(delta_ms), kind);
    }

    /// Schedule an event in **delta_secs** seconds from now.
    pub fn schedule_in_secs(&mut self, delta_secs: u64, kind: EventKind) {
        self.schedule_in(delta_secs.saturating_mul(ONE_SEC_MS), kind);
    }

    /// Schedule a full event (timestamp must be in ms, >= now).
    pub fn schedule(&mut self, event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.events.push(event);
    }

    /// Pop the next event (earliest timestamp; same-ms order by kind).
    /// Advances `now` to that timestamp.
    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    /// Timestamp of the next scheduled event without popping it.
    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events still in the queue (for tests and scenario validation).
    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(20, EventKind::SpawnRider);
        clock.schedule_at(5, EventKind::SpawnRider);
        clock.schedule_at(20, EventKind::CancelSweep);
        clock.schedule_at(10, EventKind::SpawnRider);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);

        // Same timestamp (20): SpawnRider precedes CancelSweep (phase order).
        let third = clock.pop_next().expect("third event");
        assert_eq!(third.kind, EventKind::SpawnRider);
        let fourth = clock.pop_next().expect("fourth event");
        assert_eq!(fourth.kind, EventKind::CancelSweep);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn phase_order_within_a_tick() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(100, EventKind::MoveStep);
        clock.schedule_at(100, EventKind::MatchWindow);
        clock.schedule_at(100, EventKind::CancelSweep);
        clock.schedule_at(100, EventKind::TrafficUpdate);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| clock.pop_next())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TrafficUpdate,
                EventKind::CancelSweep,
                EventKind::MatchWindow,
                EventKind::MoveStep,
            ]
        );
    }

    #[test]
    fn day_time_wraps_through_epoch() {
        let mut clock = SimulationClock::with_epoch(23 * ONE_HOUR_MS);
        clock.schedule_at(2 * ONE_HOUR_MS, EventKind::MoveStep);
        clock.pop_next();
        assert_eq!(clock.day_time(), ONE_HOUR_MS);
    }

    #[test]
    fn rush_windows_match_day_boundaries() {
        assert_eq!(rush_window(7 * ONE_HOUR_MS), Some(RushWindow::Morning));
        assert_eq!(rush_window(10 * ONE_HOUR_MS), Some(RushWindow::Morning));
        assert_eq!(rush_window(16 * ONE_HOUR_MS + 1), Some(RushWindow::Evening));
        assert_eq!(rush_window(12 * ONE_HOUR_MS), None);
        assert!(is_night(5 * ONE_HOUR_MS));
        assert!(!is_night(6 * ONE_HOUR_MS));
    }

    #[test]
    fn formats_day_time() {
        assert_eq!(format_day_time(0), "00:00:00");
        assert_eq!(
            format_day_time(9 * ONE_HOUR_MS + 5 * ONE_MIN_MS + 7 * ONE_SEC_MS),
            "09:05:07"
        );
    }
}
