//! Scenario parameters and the configuration resources they resolve into.

use bevy_ecs::prelude::Resource;

use crate::clock::ONE_SEC_MS;
use crate::matching::SwarmConfig;

/// Fixed-tick pacing: `frame_rate` ticks per wall second, each advancing the
/// simulation by `simulation_speed` times the frame interval.
#[derive(Debug, Clone, Copy, Resource)]
pub struct TickConfig {
    pub frame_rate: u32,
    pub simulation_speed: u32,
}

impl TickConfig {
    /// Simulated milliseconds covered by one tick.
    pub fn tick_ms(&self) -> u64 {
        (1000 / self.frame_rate.max(1) as u64) * self.simulation_speed.max(1) as u64
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            simulation_speed: 4,
        }
    }
}

/// Master random seed all per-concern streams derive from.
#[derive(Debug, Clone, Copy, Resource)]
pub struct MasterSeed(pub u64);

/// Count of completed match windows; feeds per-driver RNG stream derivation.
#[derive(Debug, Clone, Copy, Default, Resource)]
pub struct MatchWindowCounter(pub u64);

/// Simulation end time in ms. When present, the runner stops before
/// processing any event at or past this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTime(pub u64);

/// Traffic resampling cadence and RNG stream.
#[derive(Debug, Clone, Resource)]
pub struct TrafficConfig {
    pub period_ms: u64,
    pub seed: u64,
    /// Updates performed so far; doubles as the RNG stream offset.
    pub updates: u64,
}

/// Which matching strategy the scenario installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingStrategy {
    #[default]
    Pso,
    Greedy,
}

/// Caller-facing scenario surface. `location_name` and `screen_size` belong
/// to the ingestion and visualisation collaborators and are passed through
/// untouched.
#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub location_name: String,
    pub screen_size: (u32, u32),
    pub frame_rate: u32,
    pub simulation_speed: u32,
    /// `None` leaves the run nondeterministic.
    pub random_seed: Option<u64>,
    pub swarm: SwarmConfig,
    pub rider_interarrival_secs: (f64, f64),
    pub driver_interarrival_secs: (f64, f64),
    pub rush_hour_rate_multiplier: f64,
    pub night_rate_multiplier: f64,
    pub rush_hour_commute_bias: f64,
    pub traffic_update_period_secs: u64,
    pub matching_strategy: MatchingStrategy,
    /// Time-of-day (ms past midnight) that simulation time 0 maps to.
    pub epoch_ms: u64,
    pub end_time_ms: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            location_name: "Vilnius, Lithuania".to_string(),
            screen_size: (1280, 720),
            frame_rate: 30,
            simulation_speed: 4,
            random_seed: None,
            swarm: SwarmConfig::default(),
            rider_interarrival_secs: (2.0, 4.0),
            driver_interarrival_secs: (2.0, 4.0),
            rush_hour_rate_multiplier: 2.0,
            night_rate_multiplier: 0.3,
            rush_hour_commute_bias: 0.7,
            traffic_update_period_secs: 15,
            matching_strategy: MatchingStrategy::default(),
            epoch_ms: 0,
            end_time_ms: None,
        }
    }
}

impl SimulationParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Map simulation time 0 to a time of day (ms past midnight).
    pub fn with_epoch_ms(mut self, epoch_ms: u64) -> Self {
        self.epoch_ms = epoch_ms;
        self
    }

    /// Stop the run once the next event reaches this timestamp.
    pub fn with_end_time_ms(mut self, end_ms: u64) -> Self {
        self.end_time_ms = Some(end_ms);
        self
    }

    pub fn with_end_time_secs(self, end_secs: u64) -> Self {
        self.with_end_time_ms(end_secs * ONE_SEC_MS)
    }

    pub fn with_matching_strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.matching_strategy = strategy;
        self
    }

    pub fn with_swarm(mut self, swarm: SwarmConfig) -> Self {
        self.swarm = swarm;
        self
    }

    pub fn with_traffic_update_period_secs(mut self, secs: u64) -> Self {
        self.traffic_update_period_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_covers_frame_interval_times_speed() {
        let tick = TickConfig {
            frame_rate: 30,
            simulation_speed: 4,
        };
        assert_eq!(tick.tick_ms(), 132);
        let realtime = TickConfig {
            frame_rate: 10,
            simulation_speed: 1,
        };
        assert_eq!(realtime.tick_ms(), 100);
    }

    #[test]
    fn builders_override_defaults() {
        let params = SimulationParams::default()
            .with_seed(9)
            .with_end_time_secs(60)
            .with_matching_strategy(MatchingStrategy::Greedy);
        assert_eq!(params.random_seed, Some(9));
        assert_eq!(params.end_time_ms, Some(60_000));
        assert_eq!(params.matching_strategy, MatchingStrategy::Greedy);
    }
}
