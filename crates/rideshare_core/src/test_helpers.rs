//! Deterministic fixtures shared by unit tests, integration tests, and
//! benchmarks.

use bevy_ecs::prelude::Entity;
use rand::rngs::StdRng;

use crate::graph::{GraphDescription, NodeId, RoadGraph};
use crate::matching::{DriverBrief, RiderSnapshot};

/// Four-node fixture with a direct shortcut:
///
/// ```text
/// A(0) --3-- B(1) --4-- C(2) --4-- E(3)
///  \_______________10_____________/
/// ```
///
/// Unit speed, so travel times in ms are the metre distances x 1000:
/// `dist(A,E) = 10s` direct, `11s` via B and C.
pub fn shortcut_description() -> GraphDescription {
    let mut description = GraphDescription::default();
    description.add_node(0, 0.0, 0.0, false, false);
    description.add_node(1, 3.0, 0.0, false, false);
    description.add_node(2, 7.0, 0.0, false, false);
    description.add_node(3, 11.0, 0.0, false, false);
    description.add_edge(0, 1, 3.0, 1.0);
    description.add_edge(1, 2, 4.0, 1.0);
    description.add_edge(2, 3, 4.0, 1.0);
    description.add_edge(0, 3, 10.0, 1.0);
    description
}

pub fn shortcut_graph() -> RoadGraph {
    RoadGraph::from_description(&shortcut_description()).expect("fixture graph")
}

/// Cycle of `n` nodes with equal spacing, unit speed.
pub fn ring_graph(n: usize, spacing: f64) -> RoadGraph {
    let mut description = GraphDescription::default();
    for i in 0..n {
        let angle = (i as f64) * std::f64::consts::TAU / n as f64;
        description.add_node(i as i64, angle.cos(), angle.sin(), false, false);
    }
    for i in 0..n {
        description.add_edge(i as i64, ((i + 1) % n) as i64, spacing, 1.0);
    }
    RoadGraph::from_description(&description).expect("fixture graph")
}

/// Street grid of `width x height` nodes with `spacing` metres between
/// neighbours, unit speed. The western column is tagged central and the
/// eastern column residential, so commute bias has somewhere to point.
pub fn grid_description(width: usize, height: usize, spacing: f64) -> GraphDescription {
    let mut description = GraphDescription::default();
    let id = |x: usize, y: usize| (y * width + x) as i64;
    for y in 0..height {
        for x in 0..width {
            description.add_node(
                id(x, y),
                x as f64 * spacing,
                y as f64 * spacing,
                x == 0,
                x == width - 1,
            );
        }
    }
    for y in 0..height {
        for x in 0..width {
            if x + 1 < width {
                description.add_edge(id(x, y), id(x + 1, y), spacing, 1.0);
            }
            if y + 1 < height {
                description.add_edge(id(x, y), id(x, y + 1), spacing, 1.0);
            }
        }
    }
    description
}

/// Distinct start, end, and `k` pickup/dropoff pairs sampled from the graph.
pub fn random_pairs(
    graph: &RoadGraph,
    k: usize,
    rng: &mut StdRng,
) -> (NodeId, NodeId, Vec<(NodeId, NodeId)>) {
    let chosen = rand::seq::index::sample(rng, graph.node_count(), 2 + 2 * k);
    let nodes: Vec<NodeId> = chosen.into_iter().collect();
    let pairs = nodes[2..]
        .chunks(2)
        .map(|chunk| (chunk[0], chunk[1]))
        .collect();
    (nodes[0], nodes[1], pairs)
}

/// Idle-rider snapshot paying its solo baseline.
pub fn rider_snapshot(
    graph: &RoadGraph,
    id: u64,
    start: NodeId,
    end: NodeId,
    passenger_count: u32,
) -> RiderSnapshot {
    RiderSnapshot {
        entity: Entity::from_raw(1000 + id as u32),
        id,
        start_node: start,
        end_node: end,
        passenger_count,
        paid: graph.dist(start, end),
    }
}

/// Fresh-driver brief at `position` with no riders yet.
pub fn brief_for(
    graph: &RoadGraph,
    id: u64,
    position: NodeId,
    end: NodeId,
    seats: u32,
) -> DriverBrief {
    DriverBrief {
        entity: Entity::from_raw(id as u32),
        id,
        end_node: end,
        vacancies: seats,
        position,
        prior_cost: 0.0,
        current_cost: graph.dist(position, end),
        committed_pairs: Vec::new(),
        served_paid: 0.0,
    }
}
