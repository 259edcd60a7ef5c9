//! # Ride-Sharing Dispatch Simulator Core
//!
//! A discrete-time simulator for dynamic multi-rider, multi-driver
//! ride-sharing dispatch on a real road network.
//!
//! ## Overview
//!
//! - **Road graph facade**: planar road network with cached all-pairs
//!   shortest-travel-time tables, rebuilt on traffic updates
//! - **Routing kernel**: exact Held-Karp solver for pickup-before-dropoff
//!   constrained routes, plus reference solvers that certify it
//! - **Cost model**: cooperative savings split between driver and riders
//! - **Matching engine**: per-driver particle-swarm subset selection fanned
//!   out in parallel, with global contention resolution
//! - **Simulation loop**: event-heap clock whose same-timestamp ordering
//!   encodes the dispatch-tick phases; seeded RNG end to end
//!
//! ## Example
//!
//! ```rust,no_run
//! use bevy_ecs::prelude::World;
//! use rideshare_core::scenario::{build_scenario, SimulationParams};
//! use rideshare_core::runner::{initialize_simulation, run_until_empty, simulation_schedule};
//! use rideshare_core::test_helpers::shortcut_description;
//!
//! let mut world = World::new();
//! build_scenario(
//!     &mut world,
//!     &shortcut_description(),
//!     SimulationParams::default().with_seed(42).with_end_time_secs(600),
//! )
//! .expect("scenario");
//! initialize_simulation(&mut world);
//!
//! let mut schedule = simulation_schedule();
//! run_until_empty(&mut world, &mut schedule, 1_000_000);
//! ```

pub mod city;
pub mod clock;
pub mod ecs;
pub mod errors;
pub mod graph;
pub mod matching;
pub mod pricing;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spawner;
pub mod stats;
pub mod systems;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
