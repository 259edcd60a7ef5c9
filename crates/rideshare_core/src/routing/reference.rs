//! Reference solvers for the routing kernel.
//!
//! Three independent formulations of the same precedence-constrained
//! problem, used to certify [super::held_karp] in tests and to benchmark it:
//!
//! - [brute_force]: every permutation of the stops, filtered by precedence.
//! - [best_first]: cost-ordered expansion of partial walks with the direct
//!   distance to the terminal as an admissible lower bound.
//! - [branch_and_bound]: best-first with a stronger bound per [Bound].
//!
//! Walk states carry their pending actions as `(node, unlock)` entries: a
//! pickup unlocks its dropoff, a dropoff unlocks nothing.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use itertools::Itertools;

use crate::errors::RoutingError;
use crate::graph::{NodeId, RoadGraph};
use crate::routing::PlannedRoute;

/// Lower-bound heuristic for [branch_and_bound].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Sum over every remaining stop of its cheapest entering link.
    /// Admissible, so the search stays exact.
    SingleLink,
    /// Greedy nearest-neighbour chain through the remaining stops. Tighter
    /// in practice but not admissible; kept as the fast heuristic variant.
    NearestNeighbor,
}

/// Exhaustive search over stop permutations. Exponential; test-sized inputs
/// only.
pub fn brute_force(
    graph: &RoadGraph,
    start: NodeId,
    end: NodeId,
    pairs: &[(NodeId, NodeId)],
) -> Result<PlannedRoute, RoutingError> {
    let k = pairs.len();
    // Stop i encodes pair i/2; even stops are pickups.
    let stop_node = |stop: usize| {
        if stop % 2 == 0 {
            pairs[stop / 2].0
        } else {
            pairs[stop / 2].1
        }
    };

    let mut best: Option<PlannedRoute> = None;
    for order in (0..2 * k).permutations(2 * k) {
        let mut picked = vec![false; k];
        let mut valid = true;
        for &stop in &order {
            if stop % 2 == 0 {
                picked[stop / 2] = true;
            } else if !picked[stop / 2] {
                valid = false;
                break;
            }
        }
        if !valid {
            continue;
        }

        let mut cost = 0.0;
        let mut at = start;
        let mut stops = Vec::with_capacity(2 * k + 2);
        stops.push(start);
        for &stop in &order {
            let node = stop_node(stop);
            cost += graph.dist(at, node);
            stops.push(node);
            at = node;
        }
        cost += graph.dist(at, end);
        stops.push(end);

        if cost.is_finite() && best.as_ref().map_or(true, |b| cost < b.cost) {
            best = Some(PlannedRoute { stops, cost });
        }
    }
    best.ok_or(RoutingError::NoRoute)
}

#[derive(Debug, Clone)]
struct Walk {
    /// cost so far + lower bound; heap key.
    priority: f64,
    cost: f64,
    at: NodeId,
    stops: Vec<NodeId>,
    /// `(node, unlock)`: visiting `node` adds `unlock` to the pending set.
    pending: Vec<(NodeId, Option<NodeId>)>,
    end_done: bool,
}

impl PartialEq for Walk {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}
impl Eq for Walk {}
impl Ord for Walk {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on priority.
        other.priority.total_cmp(&self.priority)
    }
}
impl PartialOrd for Walk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn initial_walk(start: NodeId, pairs: &[(NodeId, NodeId)]) -> Walk {
    Walk {
        priority: 0.0,
        cost: 0.0,
        at: start,
        stops: vec![start],
        pending: pairs
            .iter()
            .map(|&(pickup, dropoff)| (pickup, Some(dropoff)))
            .collect(),
        end_done: false,
    }
}

fn successors(walk: &Walk, end: NodeId, graph: &RoadGraph) -> Vec<Walk> {
    let mut next = Vec::new();
    if walk.pending.is_empty() {
        if !walk.end_done {
            let leg = graph.dist(walk.at, end);
            if leg.is_finite() {
                let mut stops = walk.stops.clone();
                stops.push(end);
                next.push(Walk {
                    priority: walk.cost + leg,
                    cost: walk.cost + leg,
                    at: end,
                    stops,
                    pending: Vec::new(),
                    end_done: true,
                });
            }
        }
        return next;
    }
    for (index, &(node, unlock)) in walk.pending.iter().enumerate() {
        let leg = graph.dist(walk.at, node);
        if !leg.is_finite() {
            continue;
        }
        let mut pending = walk.pending.clone();
        pending.remove(index);
        if let Some(dropoff) = unlock {
            pending.push((dropoff, None));
        }
        let mut stops = walk.stops.clone();
        stops.push(node);
        next.push(Walk {
            priority: 0.0,
            cost: walk.cost + leg,
            at: node,
            stops,
            pending,
            end_done: false,
        });
    }
    next
}

/// Best-first expansion ordered by `cost + dist(at, terminal)`. The bound is
/// admissible and consistent over a shortest-path metric, so the first goal
/// popped is optimal.
pub fn best_first(
    graph: &RoadGraph,
    start: NodeId,
    end: NodeId,
    pairs: &[(NodeId, NodeId)],
) -> Result<PlannedRoute, RoutingError> {
    let mut heap = BinaryHeap::new();
    heap.push(initial_walk(start, pairs));

    while let Some(walk) = heap.pop() {
        if walk.end_done {
            return Ok(PlannedRoute {
                stops: walk.stops,
                cost: walk.cost,
            });
        }
        for mut successor in successors(&walk, end, graph) {
            successor.priority = successor.cost + graph.dist(successor.at, end);
            heap.push(successor);
        }
    }
    Err(RoutingError::NoRoute)
}

/// Cheapest entering link per remaining stop (terminal included), with the
/// current position as a candidate predecessor. Admissible.
fn single_link_bound(graph: &RoadGraph, walk: &Walk, end: NodeId) -> f64 {
    let mut remaining: Vec<NodeId> = walk.pending.iter().map(|&(node, _)| node).collect();
    if !walk.end_done {
        remaining.push(end);
    }
    remaining
        .iter()
        .enumerate()
        .map(|(i, &target)| {
            let from_current = graph.dist(walk.at, target);
            remaining
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &other)| graph.dist(other, target))
                .fold(from_current, f64::min)
        })
        .sum()
}

/// Greedy chain from the current position through the remaining stops, then
/// to the terminal.
fn nearest_neighbor_bound(graph: &RoadGraph, walk: &Walk, end: NodeId) -> f64 {
    let mut remaining: Vec<NodeId> = walk.pending.iter().map(|&(node, _)| node).collect();
    if !walk.end_done {
        remaining.push(end);
    }
    let mut total = 0.0;
    let mut at = walk.at;
    while !remaining.is_empty() {
        let (index, leg) = remaining
            .iter()
            .enumerate()
            .map(|(i, &node)| (i, graph.dist(at, node)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, f64::INFINITY));
        total += leg;
        at = remaining.swap_remove(index);
    }
    total
}

/// Branch-and-bound over partial walks. With [Bound::SingleLink] the result
/// matches the exact solvers; [Bound::NearestNeighbor] may prune the optimum
/// and is certified only as an upper approximation.
pub fn branch_and_bound(
    graph: &RoadGraph,
    start: NodeId,
    end: NodeId,
    pairs: &[(NodeId, NodeId)],
    bound: Bound,
) -> Result<PlannedRoute, RoutingError> {
    let estimate = |graph: &RoadGraph, walk: &Walk| match bound {
        Bound::SingleLink => single_link_bound(graph, walk, end),
        Bound::NearestNeighbor => nearest_neighbor_bound(graph, walk, end),
    };

    let mut heap = BinaryHeap::new();
    heap.push(initial_walk(start, pairs));
    let mut best: Option<PlannedRoute> = None;

    while let Some(walk) = heap.pop() {
        if let Some(ref incumbent) = best {
            if walk.priority > incumbent.cost {
                continue;
            }
        }
        if walk.end_done {
            if best.as_ref().map_or(true, |b| walk.cost < b.cost) {
                best = Some(PlannedRoute {
                    stops: walk.stops,
                    cost: walk.cost,
                });
            }
            continue;
        }
        for mut successor in successors(&walk, end, graph) {
            successor.priority = successor.cost + estimate(graph, &successor);
            if let Some(ref incumbent) = best {
                if successor.priority > incumbent.cost {
                    continue;
                }
            }
            heap.push(successor);
        }
    }
    best.ok_or(RoutingError::NoRoute)
}
