//! Per-driver particle swarm: selects the rider subset maximising savings.
//!
//! Particles are real vectors over the candidate pool; positive components,
//! ranked by magnitude, decode to a subset capped by the driver's free
//! seats. Initialisation biases the swarm toward capacity-feasible subsets
//! by seeding at most `vacancies` positive components per particle.
//!
//! Inertia and the cognitive/social coefficients interpolate linearly from
//! their `*_start` values by `*_step` over the run. The default is Clerc
//! constriction (zero steps); [SwarmConfig::annealed] is the exploratory
//! alternative with crossing cognitive/social schedules.

use rand::rngs::StdRng;
use rand::Rng;

use crate::graph::{NodeId, RoadGraph};
use crate::matching::types::{DriverBrief, RiderSnapshot};
use crate::matching::evaluate_subset;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmConfig {
    pub w_start: f64,
    pub w_step: f64,
    pub c1_start: f64,
    pub c1_step: f64,
    pub c2_start: f64,
    pub c2_step: f64,
    pub num_particles: usize,
    pub iterations: usize,
    /// Stop after this many iterations without a global-best improvement.
    pub max_no_improv_iter: u32,
    /// Stop when an iteration improves fewer personal bests than this.
    pub min_improv_particles: usize,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        // Clerc constriction coefficients, held constant.
        Self {
            w_start: 0.7298,
            w_step: 0.0,
            c1_start: 1.49618,
            c1_step: 0.0,
            c2_start: 1.49618,
            c2_step: 0.0,
            num_particles: 40,
            iterations: 50,
            max_no_improv_iter: 3,
            min_improv_particles: 1,
        }
    }
}

impl SwarmConfig {
    /// Annealed schedule: inertia 0.9 -> 0.4, cognition 2.5 -> 0.5, social
    /// 0.5 -> 2.5.
    pub fn annealed() -> Self {
        Self {
            w_start: 0.9,
            w_step: -0.5,
            c1_start: 2.5,
            c1_step: -2.0,
            c2_start: 0.5,
            c2_step: 2.0,
            ..Self::default()
        }
    }
}

/// Winning subset of one swarm run.
#[derive(Debug, Clone)]
pub struct SwarmOutcome {
    /// Indices into the candidate pool, best-ranked first.
    pub rider_indices: Vec<usize>,
    pub savings: f64,
    pub stops: Vec<NodeId>,
    pub route_cost: f64,
    /// Iterations executed before convergence or cut-off.
    pub rounds: u32,
}

/// Component vector with at most `max_positive` positive slots.
fn seeded_vector(len: usize, max_positive: usize, rng: &mut StdRng) -> Vec<f64> {
    if max_positive >= len {
        return (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();
    }
    let mut result: Vec<f64> = (0..len).map(|_| rng.gen_range(-1.0..0.0)).collect();
    let positives = rng.gen_range(0..=max_positive);
    for index in rand::seq::index::sample(rng, len, positives) {
        result[index] = rng.gen_range(0.0..1.0);
    }
    result
}

/// Positive components ranked by magnitude, greedily taken while the seat
/// budget holds.
fn decode(position: &[f64], pool: &[RiderSnapshot], vacancies: u32) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = position
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value > 0.0)
        .map(|(index, &value)| (index, value))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut budget = vacancies;
    let mut selected = Vec::new();
    for (index, _) in ranked {
        let party = pool[index].passenger_count;
        if party <= budget {
            budget -= party;
            selected.push(index);
        }
    }
    selected
}

#[derive(Clone, Default)]
struct Evaluation {
    savings: f64,
    stops: Vec<NodeId>,
    cost: f64,
}

/// Run the swarm for one driver over its compatible rider pool. `None` when
/// no subset improves on the solo baselines.
pub fn select_subset(
    graph: &RoadGraph,
    brief: &DriverBrief,
    pool: &[RiderSnapshot],
    config: &SwarmConfig,
    rng: &mut StdRng,
) -> Option<SwarmOutcome> {
    let dims = pool.len();
    if dims == 0 || config.num_particles == 0 {
        return None;
    }

    let evaluate = |indices: &[usize]| -> Evaluation {
        let joining: Vec<RiderSnapshot> = indices.iter().map(|&i| pool[i]).collect();
        match evaluate_subset(graph, brief, &joining) {
            Some((route, savings)) => Evaluation {
                savings,
                stops: route.stops,
                cost: route.cost,
            },
            None => Evaluation::default(),
        }
    };

    let max_positive = brief.vacancies as usize;
    let mut positions = Vec::with_capacity(config.num_particles);
    let mut velocities = Vec::with_capacity(config.num_particles);
    let mut pbest_positions = Vec::with_capacity(config.num_particles);
    let mut pbest_values = Vec::with_capacity(config.num_particles);
    for _ in 0..config.num_particles {
        let position = seeded_vector(dims, max_positive, rng);
        velocities.push(seeded_vector(dims, max_positive, rng));
        let value = evaluate(&decode(&position, pool, brief.vacancies));
        pbest_positions.push(position.clone());
        pbest_values.push(value);
        positions.push(position);
    }

    let mut gbest_index = 0;
    for i in 1..config.num_particles {
        if pbest_values[i].savings > pbest_values[gbest_index].savings {
            gbest_index = i;
        }
    }
    let mut gbest_position = pbest_positions[gbest_index].clone();
    let mut gbest_value = pbest_values[gbest_index].clone();

    let mut rounds = 0u32;
    let mut no_improv_iters = 0u32;
    for it in 0..config.iterations {
        rounds += 1;
        no_improv_iters += 1;
        let mut improved_particles = 0usize;
        let progress = it as f64 / config.iterations as f64;
        let w = config.w_start + config.w_step * progress;
        let c1 = config.c1_start + config.c1_step * progress;
        let c2 = config.c2_start + config.c2_step * progress;

        for i in 0..config.num_particles {
            let position = &mut positions[i];
            let velocity = &mut velocities[i];
            for j in 0..dims {
                let r1: f64 = rng.gen();
                let r2: f64 = rng.gen();
                velocity[j] = w * velocity[j]
                    + c1 * r1 * (pbest_positions[i][j] - position[j])
                    + c2 * r2 * (gbest_position[j] - position[j]);
                position[j] += velocity[j];
            }
            let value = evaluate(&decode(position, pool, brief.vacancies));
            if value.savings > pbest_values[i].savings {
                pbest_positions[i].copy_from_slice(position);
                improved_particles += 1;
                if value.savings > gbest_value.savings {
                    gbest_position.copy_from_slice(position);
                    gbest_value = value.clone();
                    no_improv_iters = 0;
                }
                pbest_values[i] = value;
            }
        }

        if no_improv_iters >= config.max_no_improv_iter
            || improved_particles < config.min_improv_particles
        {
            break;
        }
    }

    let rider_indices = decode(&gbest_position, pool, brief.vacancies);
    if rider_indices.is_empty() || gbest_value.savings <= 0.0 {
        return None;
    }
    Some(SwarmOutcome {
        rider_indices,
        savings: gbest_value.savings,
        stops: gbest_value.stops,
        route_cost: gbest_value.cost,
        rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{brief_for, rider_snapshot, shortcut_graph};
    use rand::SeedableRng;

    #[test]
    fn seeded_vectors_respect_the_positive_cap() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let v = seeded_vector(10, 3, &mut rng);
            assert_eq!(v.len(), 10);
            assert!(v.iter().filter(|&&x| x > 0.0).count() <= 3);
            assert!(v.iter().all(|&x| (-1.0..1.0).contains(&x)));
        }
    }

    #[test]
    fn decode_ranks_by_component_and_respects_seats() {
        let graph = shortcut_graph();
        let pool = vec![
            rider_snapshot(&graph, 0, 1, 2, 2),
            rider_snapshot(&graph, 1, 1, 2, 1),
            rider_snapshot(&graph, 2, 1, 2, 3),
        ];
        // Rider 2 ranks first but its party of 3 busts the budget after
        // rider 0 takes two seats.
        let selected = decode(&[0.4, 0.1, 0.9], &pool, 3);
        assert_eq!(selected, vec![2]);
        let selected = decode(&[0.4, 0.1, -0.9], &pool, 3);
        assert_eq!(selected, vec![0, 1]);
        assert!(decode(&[-0.5, -0.1, -0.9], &pool, 3).is_empty());
    }

    #[test]
    fn swarm_finds_the_beneficial_rider() {
        let graph = shortcut_graph();
        let brief = brief_for(&graph, 0, 0, 3, 4);
        let pool = vec![rider_snapshot(&graph, 0, 1, 2, 1)];
        let mut rng = StdRng::seed_from_u64(42);
        let outcome =
            select_subset(&graph, &brief, &pool, &SwarmConfig::default(), &mut rng)
                .expect("outcome");
        assert_eq!(outcome.rider_indices, vec![0]);
        assert!((outcome.savings - 3_000.0).abs() < 1e-6);
        assert_eq!(outcome.stops, vec![0, 1, 2, 3]);
        assert!(outcome.rounds >= 1);
    }

    #[test]
    fn swarm_rejects_pools_with_no_improvement() {
        let graph = shortcut_graph();
        // Driver A->B cannot profitably serve a C->D rider on this graph.
        let brief = brief_for(&graph, 0, 0, 1, 4);
        let pool = vec![rider_snapshot(&graph, 0, 2, 3, 1)];
        let mut rng = StdRng::seed_from_u64(42);
        assert!(
            select_subset(&graph, &brief, &pool, &SwarmConfig::default(), &mut rng).is_none()
        );
    }

    #[test]
    fn identical_seeds_reproduce_the_outcome() {
        let graph = shortcut_graph();
        let brief = brief_for(&graph, 0, 0, 3, 4);
        let pool = vec![
            rider_snapshot(&graph, 0, 1, 2, 1),
            rider_snapshot(&graph, 1, 1, 2, 2),
        ];
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            select_subset(&graph, &brief, &pool, &SwarmConfig::default(), &mut rng)
                .map(|o| (o.rider_indices, o.savings.to_bits(), o.rounds))
        };
        assert_eq!(run(7), run(7));
    }
}
