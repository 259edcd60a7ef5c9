//! Builds a runnable world from a graph description and parameters.

use bevy_ecs::prelude::World;

use crate::clock::{SimulationClock, ONE_SEC_MS};
use crate::ecs::IdAllocator;
use crate::errors::SimError;
use crate::graph::{GraphDescription, RoadGraph};
use crate::matching::{GreedyMatching, MatchingAlgorithmResource, PsoBatchMatching};
use crate::scenario::params::{
    MasterSeed, MatchWindowCounter, MatchingStrategy, SimulationEndTime, SimulationParams,
    TickConfig, TrafficConfig,
};
use crate::spawner::{DriverSpawner, GeneratorConfig, NodePools, RiderSpawner};
use crate::telemetry::{EventLog, SimTelemetry};

/// Per-concern seed stream offsets under the master seed.
const GENERATOR_SEED_OFFSET: u64 = 0xA5A5_A5A5;
const TRAFFIC_SEED_OFFSET: u64 = 0x5A5A_5A5A;

fn validate(params: &SimulationParams) -> Result<(), SimError> {
    if params.frame_rate == 0 || params.frame_rate > 1000 {
        return Err(SimError::InvalidConfig(
            "frame_rate must be between 1 and 1000".into(),
        ));
    }
    if params.simulation_speed == 0 {
        return Err(SimError::InvalidConfig("simulation_speed must be > 0".into()));
    }
    for (label, (low, high)) in [
        ("rider_interarrival_secs", params.rider_interarrival_secs),
        ("driver_interarrival_secs", params.driver_interarrival_secs),
    ] {
        if !(low > 0.0 && high >= low) {
            return Err(SimError::InvalidConfig(format!(
                "{label} must be a positive, ordered range"
            )));
        }
    }
    if params.rush_hour_rate_multiplier <= 0.0 || params.night_rate_multiplier <= 0.0 {
        return Err(SimError::InvalidConfig(
            "rate multipliers must be positive".into(),
        ));
    }
    if !(0.0..=1.0).contains(&params.rush_hour_commute_bias) {
        return Err(SimError::InvalidConfig(
            "rush_hour_commute_bias must be within [0, 1]".into(),
        ));
    }
    if params.traffic_update_period_secs == 0 {
        return Err(SimError::InvalidConfig(
            "traffic_update_period_secs must be > 0".into(),
        ));
    }
    if params.swarm.num_particles == 0 || params.swarm.iterations == 0 {
        return Err(SimError::InvalidConfig(
            "swarm must have particles and iterations".into(),
        ));
    }
    Ok(())
}

/// Wire every resource a run needs into `world`. Fails before the loop
/// starts on a bad graph or configuration.
pub fn build_scenario(
    world: &mut World,
    description: &GraphDescription,
    params: SimulationParams,
) -> Result<(), SimError> {
    validate(&params)?;
    let graph = RoadGraph::from_description(description)?;
    let pools = NodePools {
        all: graph.nodes_where(|_| true),
        central: graph.nodes_where(|node| node.is_center),
        residential: graph.nodes_where(|node| node.is_residential),
    };

    let seed = params.random_seed.unwrap_or_else(rand::random);
    world.insert_resource(MasterSeed(seed));
    world.insert_resource(SimulationClock::with_epoch(params.epoch_ms));
    world.insert_resource(TickConfig {
        frame_rate: params.frame_rate,
        simulation_speed: params.simulation_speed,
    });
    world.insert_resource(GeneratorConfig {
        rider_interarrival_secs: params.rider_interarrival_secs,
        driver_interarrival_secs: params.driver_interarrival_secs,
        rush_hour_rate_multiplier: params.rush_hour_rate_multiplier,
        night_rate_multiplier: params.night_rate_multiplier,
        rush_hour_commute_bias: params.rush_hour_commute_bias,
        seed: seed.wrapping_add(GENERATOR_SEED_OFFSET),
    });
    world.insert_resource(TrafficConfig {
        period_ms: params.traffic_update_period_secs * ONE_SEC_MS,
        seed: seed.wrapping_add(TRAFFIC_SEED_OFFSET),
        updates: 0,
    });
    let algorithm: MatchingAlgorithmResource = match params.matching_strategy {
        MatchingStrategy::Pso => {
            MatchingAlgorithmResource::new(Box::new(PsoBatchMatching::new(params.swarm)))
        }
        MatchingStrategy::Greedy => MatchingAlgorithmResource::new(Box::new(GreedyMatching)),
    };
    world.insert_resource(algorithm);
    world.insert_resource(MatchWindowCounter::default());
    world.insert_resource(IdAllocator::default());
    world.insert_resource(EventLog::default());
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(RiderSpawner::default());
    world.insert_resource(DriverSpawner::default());
    world.insert_resource(pools);
    world.insert_resource(graph);
    if let Some(end_ms) = params.end_time_ms {
        world.insert_resource(SimulationEndTime(end_ms));
    }
    Ok(())
}
