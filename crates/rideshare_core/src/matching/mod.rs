//! Matching engine: pluggable strategies for assigning idle riders to
//! active drivers.
//!
//! Algorithms work on frozen snapshots ([types::DriverBrief],
//! [types::RiderSnapshot]) instead of live ECS state, so candidate
//! generation can fan out across worker threads without synchronisation.
//! The match-window system builds the snapshots, calls the configured
//! algorithm, and applies the returned [types::Assignment]s.
//!
//! ## Implementations
//!
//! - [PsoBatchMatching]: per-driver particle-swarm subset selection with
//!   global contention resolution (the production strategy).
//! - [GreedyMatching]: per-rider best-driver assignment (reference baseline
//!   for tests and benchmarks).

pub mod algorithm;
pub mod greedy;
pub mod pso_batch;
pub mod swarm;
pub mod types;

use bevy_ecs::prelude::Resource;

pub use algorithm::MatchingAlgorithm;
pub use greedy::GreedyMatching;
pub use pso_batch::PsoBatchMatching;
pub use swarm::{SwarmConfig, SwarmOutcome};
pub use types::{Assignment, Candidate, DriverBrief, RiderSnapshot};

use crate::graph::RoadGraph;
use crate::pricing::{break_even_route_cost, remaining_cost};
use crate::routing::{held_karp, PlannedRoute};

/// Resource wrapper for the matching algorithm trait object.
#[derive(Resource)]
pub struct MatchingAlgorithmResource(pub Box<dyn MatchingAlgorithm>);

impl MatchingAlgorithmResource {
    pub fn new(algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        Self(algorithm)
    }
}

impl std::ops::Deref for MatchingAlgorithmResource {
    type Target = dyn MatchingAlgorithm;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Evaluate one driver taking `joining` riders on top of its committed
/// stops. Returns the joint route and the resulting savings, or `None` when
/// the subset is empty, over capacity, or not an improvement over the solo
/// baselines.
///
/// The zero-savings cost is passed to the kernel as its pruning bound, so an
/// `Ok` route always carries strictly positive savings.
pub(crate) fn evaluate_subset(
    graph: &RoadGraph,
    brief: &DriverBrief,
    joining: &[RiderSnapshot],
) -> Option<(PlannedRoute, f64)> {
    if joining.is_empty() {
        return None;
    }
    let party: u32 = joining.iter().map(|r| r.passenger_count).sum();
    if party > brief.vacancies {
        return None;
    }

    let paid_sum: f64 = joining.iter().map(|r| r.paid).sum();
    let mut pairs = brief.committed_pairs.clone();
    pairs.extend(joining.iter().map(|r| (r.start_node, r.end_node)));

    let bound = break_even_route_cost(
        brief.current_cost,
        paid_sum,
        brief.prior_cost,
        brief.served_paid,
    );
    let route = held_karp(graph, brief.position, brief.end_node, &pairs, bound).ok()?;
    let savings = brief.current_cost + paid_sum
        - remaining_cost(brief.prior_cost, route.cost, brief.served_paid);
    Some((route, savings))
}
