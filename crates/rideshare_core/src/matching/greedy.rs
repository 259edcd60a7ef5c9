//! Greedy reference matcher: each rider, in arrival order, goes to the
//! driver whose joint route saves the most.
//!
//! Commitments are applied to local copies of the driver briefs as the pass
//! proceeds, so later riders see earlier assignments. Deterministic and
//! swarm-free; used as the baseline strategy in tests and benchmarks.

use crate::graph::RoadGraph;
use crate::matching::algorithm::MatchingAlgorithm;
use crate::matching::types::{Assignment, DriverBrief, RiderSnapshot};
use crate::matching::evaluate_subset;
use crate::pricing::{remaining_cost, split_fares};

pub struct GreedyMatching;

impl MatchingAlgorithm for GreedyMatching {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn propose(
        &self,
        graph: &RoadGraph,
        drivers: &[DriverBrief],
        riders: &[RiderSnapshot],
        _seed: u64,
        _window: u64,
    ) -> Vec<Assignment> {
        let mut briefs: Vec<DriverBrief> = drivers.to_vec();
        let mut assignments: Vec<Assignment> = Vec::new();

        for rider in riders {
            let mut best: Option<(usize, f64, Vec<_>, f64)> = None;
            for (index, brief) in briefs.iter().enumerate() {
                let Some((route, savings)) = evaluate_subset(graph, brief, &[*rider]) else {
                    continue;
                };
                if best.as_ref().map_or(true, |&(_, s, _, _)| savings > s) {
                    best = Some((index, savings, route.stops, route.cost));
                }
            }
            let Some((index, _, stops, route_cost)) = best else {
                continue;
            };

            let brief = &mut briefs[index];
            let c_remaining = remaining_cost(brief.prior_cost, route_cost, brief.served_paid);
            let Some(split) = split_fares(brief.current_cost, &[rider.paid], c_remaining)
            else {
                continue;
            };
            let rider_cost = split.rider_costs[0];

            brief.vacancies -= rider.passenger_count;
            brief.current_cost = split.driver_cost;
            brief.served_paid += rider_cost;
            brief
                .committed_pairs
                .push((rider.start_node, rider.end_node));

            match assignments
                .iter_mut()
                .find(|a| a.driver == brief.entity)
            {
                Some(existing) => {
                    existing.riders.push((rider.entity, rider_cost));
                    existing.driver_cost = split.driver_cost;
                    existing.stops = stops;
                    existing.route_cost = route_cost;
                    existing.savings += split.savings;
                }
                None => assignments.push(Assignment {
                    driver: brief.entity,
                    driver_cost: split.driver_cost,
                    riders: vec![(rider.entity, rider_cost)],
                    stops,
                    route_cost,
                    savings: split.savings,
                }),
            }
        }
        assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{brief_for, rider_snapshot, shortcut_graph};

    #[test]
    fn assigns_the_rider_to_the_best_driver() {
        let graph = shortcut_graph();
        let drivers = vec![brief_for(&graph, 0, 0, 3, 4), brief_for(&graph, 1, 1, 3, 4)];
        let riders = vec![rider_snapshot(&graph, 0, 1, 2, 1)];
        let assignments = GreedyMatching.propose(&graph, &drivers, &riders, 0, 0);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].driver, drivers[1].entity);
        assert!((assignments[0].savings - 4_000.0).abs() < 1e-6);
    }

    #[test]
    fn later_riders_see_earlier_commitments() {
        let graph = shortcut_graph();
        // One free seat: the second rider must not fit.
        let drivers = vec![brief_for(&graph, 0, 0, 3, 1)];
        let riders = vec![
            rider_snapshot(&graph, 0, 1, 2, 1),
            rider_snapshot(&graph, 1, 1, 2, 1),
        ];
        let assignments = GreedyMatching.propose(&graph, &drivers, &riders, 0, 0);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].riders.len(), 1);
        assert_eq!(assignments[0].riders[0].0, riders[0].entity);
    }

    #[test]
    fn no_driver_improves_no_assignment() {
        let graph = shortcut_graph();
        let drivers = vec![brief_for(&graph, 0, 0, 1, 4)];
        let riders = vec![rider_snapshot(&graph, 0, 2, 3, 1)];
        assert!(GreedyMatching
            .propose(&graph, &drivers, &riders, 0, 0)
            .is_empty());
    }
}
