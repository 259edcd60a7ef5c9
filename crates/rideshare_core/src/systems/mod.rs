//! Event-reacting systems, wired into the runner's schedule.
//!
//! Each system guards on its [crate::clock::EventKind] and reschedules its
//! own next occurrence, so the schedule itself stays declarative.

pub mod dispatch;
pub mod movement;
pub mod simulation_started;
pub mod spawner;
pub mod traffic;
