//! Batch matching: per-driver swarms fanned out in parallel, then a single
//! global pass that resolves rider contention by savings rank.
//!
//! Each driver's swarm runs on its own rayon worker against immutable
//! snapshots, seeded from the master seed, the driver id, and the window
//! counter, so the fan-out stays reproducible regardless of scheduling.
//! Contention resolution is sequential: candidates are visited best-savings
//! first, their subsets filtered to still-unmatched riders, and any strict
//! subset is re-routed through the kernel before pricing so spliced routes
//! can never over-report savings.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::graph::RoadGraph;
use crate::matching::algorithm::MatchingAlgorithm;
use crate::matching::swarm::{select_subset, SwarmConfig};
use crate::matching::types::{Assignment, Candidate, DriverBrief, RiderSnapshot};
use crate::matching::evaluate_subset;
use crate::pricing::{remaining_cost, split_fares};

pub struct PsoBatchMatching {
    pub swarm: SwarmConfig,
}

impl PsoBatchMatching {
    pub fn new(swarm: SwarmConfig) -> Self {
        Self { swarm }
    }
}

impl Default for PsoBatchMatching {
    fn default() -> Self {
        Self::new(SwarmConfig::default())
    }
}

/// Per-driver RNG stream for one window.
fn driver_rng(seed: u64, driver_id: u64, window: u64) -> StdRng {
    let stream = seed
        .wrapping_add(driver_id.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(window.wrapping_mul(0xD1B5_4A32_D192_ED03));
    StdRng::seed_from_u64(stream)
}

/// Riders worth evaluating for this driver: the pickup/dropoff detour must
/// not already exceed the driver's remaining solo distance, and the party
/// must fit the free seats.
fn compatible_pool(
    graph: &RoadGraph,
    brief: &DriverBrief,
    riders: &[RiderSnapshot],
) -> (Vec<RiderSnapshot>, Vec<usize>) {
    let solo_remaining = graph.dist(brief.position, brief.end_node);
    let mut pool = Vec::new();
    let mut origin_index = Vec::new();
    for (index, rider) in riders.iter().enumerate() {
        if rider.passenger_count > brief.vacancies {
            continue;
        }
        let detour = graph.dist(brief.position, rider.start_node)
            + graph.dist(rider.end_node, brief.end_node);
        if !detour.is_finite() || detour > solo_remaining {
            continue;
        }
        pool.push(*rider);
        origin_index.push(index);
    }
    (pool, origin_index)
}

impl MatchingAlgorithm for PsoBatchMatching {
    fn name(&self) -> &'static str {
        "pso-batch"
    }

    fn propose(
        &self,
        graph: &RoadGraph,
        drivers: &[DriverBrief],
        riders: &[RiderSnapshot],
        seed: u64,
        window: u64,
    ) -> Vec<Assignment> {
        if drivers.is_empty() || riders.is_empty() {
            return Vec::new();
        }

        // Candidate generation: independent per driver, joined afterwards.
        let mut candidates: Vec<Candidate> = drivers
            .par_iter()
            .enumerate()
            .filter_map(|(driver_index, brief)| {
                if brief.vacancies == 0 {
                    return None;
                }
                let (pool, origin_index) = compatible_pool(graph, brief, riders);
                if pool.is_empty() {
                    return None;
                }
                let mut rng = driver_rng(seed, brief.id, window);
                let outcome = select_subset(graph, brief, &pool, &self.swarm, &mut rng)?;
                Some(Candidate {
                    driver_index,
                    rider_indices: outcome
                        .rider_indices
                        .iter()
                        .map(|&pool_index| origin_index[pool_index])
                        .collect(),
                    savings: outcome.savings,
                    stops: outcome.stops,
                    route_cost: outcome.route_cost,
                    rounds: outcome.rounds,
                })
            })
            .collect();

        // Best savings first; driver id breaks ties for determinism.
        candidates.sort_by(|a, b| {
            b.savings
                .total_cmp(&a.savings)
                .then_with(|| drivers[a.driver_index].id.cmp(&drivers[b.driver_index].id))
        });

        let mut unmatched = vec![true; riders.len()];
        let mut assignments = Vec::new();
        for candidate in candidates {
            let brief = &drivers[candidate.driver_index];

            let mut budget = brief.vacancies;
            let mut kept: Vec<usize> = Vec::new();
            for &rider_index in &candidate.rider_indices {
                if !unmatched[rider_index] {
                    continue;
                }
                let party = riders[rider_index].passenger_count;
                if party > budget {
                    continue;
                }
                budget -= party;
                kept.push(rider_index);
            }
            if kept.is_empty() {
                continue;
            }

            // A thinned subset invalidates the swarm's route: re-route over
            // the kept pairs instead of splicing stops out.
            let (stops, route_cost, savings) = if kept.len() == candidate.rider_indices.len() {
                (candidate.stops, candidate.route_cost, candidate.savings)
            } else {
                let joining: Vec<RiderSnapshot> =
                    kept.iter().map(|&i| riders[i]).collect();
                match evaluate_subset(graph, brief, &joining) {
                    Some((route, savings)) => (route.stops, route.cost, savings),
                    None => continue,
                }
            };

            let joining_paid: Vec<f64> = kept.iter().map(|&i| riders[i].paid).collect();
            let c_remaining = remaining_cost(brief.prior_cost, route_cost, brief.served_paid);
            let Some(split) = split_fares(brief.current_cost, &joining_paid, c_remaining)
            else {
                continue;
            };
            debug_assert!((split.savings - savings).abs() <= 1e-6 * savings.max(1.0));

            for &rider_index in &kept {
                unmatched[rider_index] = false;
            }
            assignments.push(Assignment {
                driver: brief.entity,
                driver_cost: split.driver_cost,
                riders: kept
                    .iter()
                    .zip(split.rider_costs)
                    .map(|(&rider_index, cost)| (riders[rider_index].entity, cost))
                    .collect(),
                stops,
                route_cost,
                savings: split.savings,
            });
        }
        assignments
    }
}
