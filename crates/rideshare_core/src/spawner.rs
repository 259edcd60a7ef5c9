//! Spawner state and sampling: interarrival times, commute-biased trip
//! endpoints, and party/seat sizes.
//!
//! Generators are cooperative timers on the simulation clock: each spawn
//! event samples the next interarrival and reschedules itself. Arrival
//! rates scale with the simulated day (denser during rush windows, sparser
//! at night), and rush-hour trips are biased along the commute direction:
//! residential to center in the morning, center to residential in the
//! evening.

use bevy_ecs::prelude::Resource;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::clock::{is_night, rush_window, RushWindow};
use crate::graph::NodeId;

/// Generator knobs (part of the caller-facing configuration surface).
#[derive(Debug, Clone, Resource)]
pub struct GeneratorConfig {
    /// Uniform rider interarrival range, in simulation seconds.
    pub rider_interarrival_secs: (f64, f64),
    /// Uniform driver interarrival range, in simulation seconds.
    pub driver_interarrival_secs: (f64, f64),
    /// Interarrival divisor inside rush windows (> 1 means denser arrivals).
    pub rush_hour_rate_multiplier: f64,
    /// Interarrival divisor at night (< 1 means sparser arrivals).
    pub night_rate_multiplier: f64,
    /// Probability that a rush-hour trip follows the commute direction.
    pub rush_hour_commute_bias: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rider_interarrival_secs: (2.0, 4.0),
            driver_interarrival_secs: (2.0, 4.0),
            rush_hour_rate_multiplier: 2.0,
            night_rate_multiplier: 0.3,
            rush_hour_commute_bias: 0.7,
            seed: 0,
        }
    }
}

/// Node pools for endpoint sampling, resolved once from the graph's area
/// tags.
#[derive(Debug, Clone, Default, Resource)]
pub struct NodePools {
    pub all: Vec<NodeId>,
    pub central: Vec<NodeId>,
    pub residential: Vec<NodeId>,
}

/// Rider generator bookkeeping: `spawned` doubles as the RNG stream offset.
#[derive(Debug, Default, Resource)]
pub struct RiderSpawner {
    pub spawned: u64,
}

/// Driver generator bookkeeping.
#[derive(Debug, Default, Resource)]
pub struct DriverSpawner {
    pub spawned: u64,
}

/// Sample the next interarrival gap in ms for the given base range,
/// adjusted for the time of day.
pub fn interarrival_ms(
    range_secs: (f64, f64),
    day_ms: u64,
    config: &GeneratorConfig,
    rng: &mut StdRng,
) -> u64 {
    let mut gap_secs = rng.gen_range(range_secs.0..=range_secs.1);
    if rush_window(day_ms).is_some() {
        gap_secs /= config.rush_hour_rate_multiplier.max(f64::MIN_POSITIVE);
    }
    if is_night(day_ms) {
        gap_secs /= config.night_rate_multiplier.max(f64::MIN_POSITIVE);
    }
    (gap_secs * 1000.0).round().max(1.0) as u64
}

const ENDPOINT_ATTEMPTS: usize = 16;

/// Pick distinct trip endpoints, following the commute direction with
/// probability `config.rush_hour_commute_bias` during a rush window.
pub fn trip_endpoints(
    pools: &NodePools,
    day_ms: u64,
    config: &GeneratorConfig,
    rng: &mut StdRng,
) -> Option<(NodeId, NodeId)> {
    if pools.all.len() < 2 {
        return None;
    }
    let rush = rush_window(day_ms);
    for _ in 0..ENDPOINT_ATTEMPTS {
        let commute = rush.is_some()
            && !pools.central.is_empty()
            && !pools.residential.is_empty()
            && rng.gen::<f64>() < config.rush_hour_commute_bias;
        let (start, end) = if commute {
            match rush {
                Some(RushWindow::Morning) => (
                    *pools.residential.choose(rng)?,
                    *pools.central.choose(rng)?,
                ),
                _ => (
                    *pools.central.choose(rng)?,
                    *pools.residential.choose(rng)?,
                ),
            }
        } else {
            (*pools.all.choose(rng)?, *pools.all.choose(rng)?)
        };
        if start != end {
            return Some((start, end));
        }
    }
    None
}

/// Party size of a spawning rider: 1-3 passengers, small parties dominant.
pub fn rider_party(rng: &mut StdRng) -> u32 {
    let weights = WeightedIndex::new([0.8, 0.15, 0.05]).expect("static weights");
    1 + weights.sample(rng) as u32
}

/// Seat count of a spawning driver: 1-4, four-seaters dominant.
pub fn driver_seats(rng: &mut StdRng) -> u32 {
    let weights = WeightedIndex::new([0.15, 0.2, 0.05, 0.6]).expect("static weights");
    1 + weights.sample(rng) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ONE_HOUR_MS;
    use rand::SeedableRng;

    fn pools() -> NodePools {
        NodePools {
            all: vec![0, 1, 2, 3],
            central: vec![0, 1],
            residential: vec![2, 3],
        }
    }

    #[test]
    fn interarrival_scales_with_day_phase() {
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let midday = interarrival_ms((2.0, 4.0), 12 * ONE_HOUR_MS, &config, &mut rng);
        assert!((2_000..=4_000).contains(&midday));
        let rush = interarrival_ms((2.0, 4.0), 8 * ONE_HOUR_MS, &config, &mut rng);
        assert!((1_000..=2_000).contains(&rush));
        let night = interarrival_ms((2.0, 4.0), 2 * ONE_HOUR_MS, &config, &mut rng);
        assert!((6_000..=13_400).contains(&night));
    }

    #[test]
    fn endpoints_are_distinct() {
        let config = GeneratorConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let (start, end) =
                trip_endpoints(&pools(), 12 * ONE_HOUR_MS, &config, &mut rng).expect("endpoints");
            assert_ne!(start, end);
        }
    }

    #[test]
    fn morning_commutes_run_residential_to_center() {
        let config = GeneratorConfig {
            rush_hour_commute_bias: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let pools = pools();
        for _ in 0..50 {
            let (start, end) =
                trip_endpoints(&pools, 8 * ONE_HOUR_MS, &config, &mut rng).expect("endpoints");
            assert!(pools.residential.contains(&start));
            assert!(pools.central.contains(&end));
        }
        for _ in 0..50 {
            let (start, end) =
                trip_endpoints(&pools, 17 * ONE_HOUR_MS, &config, &mut rng).expect("endpoints");
            assert!(pools.central.contains(&start));
            assert!(pools.residential.contains(&end));
        }
    }

    #[test]
    fn party_and_seat_sizes_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..200 {
            assert!((1..=3).contains(&rider_party(&mut rng)));
            assert!((1..=4).contains(&driver_seats(&mut rng)));
        }
    }
}
