//! Scenario assembly: parameter surface and world wiring.

pub mod build;
pub mod params;

pub use build::build_scenario;
pub use params::{
    MasterSeed, MatchWindowCounter, MatchingStrategy, SimulationEndTime, SimulationParams,
    TickConfig, TrafficConfig,
};
