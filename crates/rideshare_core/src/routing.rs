//! Routing kernel: exact precedence-constrained sequential route solving.
//!
//! Given a start node, a terminal node, and ordered (pickup, dropoff) pairs,
//! [held_karp] finds the cheapest walk that starts at the start, ends at the
//! terminal, visits every pickup and dropoff exactly once, and visits each
//! pickup strictly before its dropoff. Leg costs come from the road graph's
//! all-pairs travel-time table.
//!
//! City indexing: `0` = start, `1` = terminal, `2i+2`/`2i+3` = pickup/dropoff
//! of pair `i` (pickups even, dropoffs odd). The DP state is
//! `dp[subset][last]`, iterated over odd bitmasks only (the start city is in
//! every reachable subset), with the terminal admitted only as the final
//! city. A caller-supplied cost bound stops dominated states from
//! propagating, which is how the matcher encodes "reject unless this beats
//! the solo baselines".
//!
//! [reference] holds the approximate/exhaustive solvers used to certify this
//! one in tests and benchmarks.

pub mod reference;

use crate::errors::RoutingError;
use crate::graph::{NodeId, RoadGraph};

/// Practical ceiling on cities per request (start + terminal + 10 pairs).
pub const MAX_ROUTE_CITIES: usize = 22;

/// City-level solver result: the visiting order (including start and
/// terminal) and its travel-time cost.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub stops: Vec<NodeId>,
    pub cost: f64,
}

/// Exact Held-Karp solve. `bound` is an exclusive cost ceiling: states at or
/// above it are not propagated and a result at or above it reports
/// [RoutingError::NoRoute]. Pass `f64::INFINITY` for an unbounded solve.
pub fn held_karp(
    graph: &RoadGraph,
    start: NodeId,
    end: NodeId,
    pairs: &[(NodeId, NodeId)],
    bound: f64,
) -> Result<PlannedRoute, RoutingError> {
    let n = 2 + 2 * pairs.len();
    if n > MAX_ROUTE_CITIES {
        return Err(RoutingError::TooManyCities {
            cities: n,
            max: MAX_ROUTE_CITIES,
        });
    }

    let mut cities = Vec::with_capacity(n);
    cities.push(start);
    cities.push(end);
    for &(pickup, dropoff) in pairs {
        cities.push(pickup);
        cities.push(dropoff);
    }

    // Leg costs between cities, resolved once up front.
    let mut leg = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            leg[i * n + j] = graph.dist(cities[i], cities[j]);
        }
    }

    let size = 1usize << n;
    let mut dp = vec![f64::INFINITY; size * n];
    let mut parent = vec![-1i8; size * n];
    dp[n] = 0.0; // subset {start}, last = start

    let full_except_end = size - 1 - 2;
    for subset in (1..size).step_by(2) {
        // The start city is only ever the predecessor in the initial state.
        let (prev_lo, prev_hi) = if subset == 1 { (0, 1) } else { (2, n) };
        for prev in prev_lo..prev_hi {
            if subset & (1 << prev) == 0 {
                continue;
            }
            let current = dp[subset * n + prev];
            if !(current < bound) {
                continue;
            }
            // The terminal is admitted only once everything else is visited.
            let (next_lo, next_hi) = if subset == full_except_end { (1, 2) } else { (2, n) };
            for next in next_lo..next_hi {
                if subset & (1 << next) != 0 {
                    continue;
                }
                // A dropoff is reachable only after its pickup.
                if next % 2 == 1 && subset & (1 << (next - 1)) == 0 {
                    continue;
                }
                let candidate = current + leg[prev * n + next];
                let slot = (subset | (1 << next)) * n + next;
                if candidate < dp[slot] && candidate < bound {
                    dp[slot] = candidate;
                    parent[slot] = prev as i8;
                }
            }
        }
    }

    let full = size - 1;
    let cost = dp[full * n + 1];
    if !(cost < bound) || !cost.is_finite() {
        return Err(RoutingError::NoRoute);
    }

    let mut stops = Vec::with_capacity(n);
    let mut subset = full;
    let mut city = 1i32;
    while city >= 0 {
        stops.push(cities[city as usize]);
        let up = parent[subset * n + city as usize];
        subset ^= 1 << city;
        city = i32::from(up);
    }
    stops.reverse();

    Ok(PlannedRoute { stops, cost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ring_graph, shortcut_graph};

    #[test]
    fn no_pairs_is_the_direct_path() {
        let graph = shortcut_graph();
        let route = held_karp(&graph, 0, 3, &[], f64::INFINITY).expect("route");
        assert_eq!(route.stops, vec![0, 3]);
        assert_eq!(route.cost, 10_000.0);
    }

    #[test]
    fn single_pair_detours_through_pickup_then_dropoff() {
        // A -> E direct is 10s; via B and C it is 3 + 4 + 4 = 11s.
        let graph = shortcut_graph();
        let route = held_karp(&graph, 0, 3, &[(1, 2)], f64::INFINITY).expect("route");
        assert_eq!(route.stops, vec![0, 1, 2, 3]);
        assert_eq!(route.cost, 11_000.0);
    }

    #[test]
    fn precedence_blocks_the_cheaper_reversed_order() {
        // On a ring the geometrically cheaper order may drop before picking
        // up; the solver must still pick up first.
        let graph = ring_graph(6, 1.0);
        let route = held_karp(&graph, 0, 3, &[(2, 1)], f64::INFINITY).expect("route");
        let pickup_at = route.stops.iter().position(|&s| s == 2).expect("pickup");
        let dropoff_at = route.stops.iter().position(|&s| s == 1).expect("dropoff");
        assert!(pickup_at < dropoff_at);
    }

    #[test]
    fn two_pairs_interleave_when_cheaper() {
        let graph = ring_graph(8, 1.0);
        let route = held_karp(&graph, 0, 4, &[(1, 3), (2, 5)], f64::INFINITY).expect("route");
        assert_eq!(route.stops.first(), Some(&0));
        assert_eq!(route.stops.last(), Some(&4));
        for (pickup, dropoff) in [(1, 3), (2, 5)] {
            let p = route.stops.iter().position(|&s| s == pickup).expect("p");
            let q = route.stops.iter().position(|&s| s == dropoff).expect("q");
            assert!(p < q);
        }
    }

    #[test]
    fn bound_rejects_routes_at_or_above_it() {
        let graph = shortcut_graph();
        assert_eq!(
            held_karp(&graph, 0, 3, &[(1, 2)], 11_000.0),
            Err(RoutingError::NoRoute)
        );
        assert!(held_karp(&graph, 0, 3, &[(1, 2)], 11_001.0).is_ok());
    }

    #[test]
    fn city_ceiling_is_enforced() {
        let graph = ring_graph(6, 1.0);
        let pairs = vec![(1, 2); 11];
        assert_eq!(
            held_karp(&graph, 0, 3, &pairs, f64::INFINITY),
            Err(RoutingError::TooManyCities {
                cities: 24,
                max: MAX_ROUTE_CITIES
            })
        );
    }
}
