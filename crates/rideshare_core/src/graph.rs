//! Road graph facade: static topology plus cached all-pairs shortest paths.
//!
//! The graph is built once from an externally supplied [GraphDescription]
//! (the map-ingestion collaborator owns parsing and projection). Nodes carry
//! planar metric coordinates and center/residential area tags; every
//! described edge is inserted in both directions with a geometric distance,
//! a nominal speed, and a live speed (nominal x congestion).
//!
//! All-pairs tables are travel-time weighted (milliseconds, matching the
//! clock) and are rebuilt exactly twice per lifecycle stage: at construction
//! and on each traffic update. Reads between rebuilds see a frozen snapshot,
//! which is what lets the matching fan-out run without locks.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use pathfinding::directed::dijkstra::dijkstra_all;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::clock::rush_window;
use crate::errors::SimError;

pub type NodeId = usize;
pub type EdgeId = usize;

/// Node as supplied by the ingestion collaborator. `id` is the external
/// (source map) identifier; the graph assigns dense indices internally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub is_center: bool,
    pub is_residential: bool,
}

/// Edge as supplied by the ingestion collaborator. Distance in metres,
/// nominal speed in metres per second. Inserted in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: i64,
    pub to: i64,
    pub distance: f64,
    pub base_speed: f64,
}

/// Pre-built adjacency description consumed by [RoadGraph::from_description].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl GraphDescription {
    pub fn add_node(&mut self, id: i64, x: f64, y: f64, is_center: bool, is_residential: bool) {
        self.nodes.push(NodeSpec {
            id,
            x,
            y,
            is_center,
            is_residential,
        });
    }

    pub fn add_edge(&mut self, from: i64, to: i64, distance: f64, base_speed: f64) {
        self.edges.push(EdgeSpec {
            from,
            to,
            distance,
            base_speed,
        });
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoadNode {
    pub x: f64,
    pub y: f64,
    pub is_center: bool,
    pub is_residential: bool,
}

/// Directed edge. `speed` is the live speed (nominal x congestion factor),
/// resampled on every traffic update.
#[derive(Debug, Clone, Copy)]
pub struct RoadEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub distance: f64,
    pub base_speed: f64,
    pub speed: f64,
}

impl RoadEdge {
    /// Travel time of this edge at its current speed, in milliseconds.
    pub fn travel_time_ms(&self) -> u64 {
        travel_time_ms(self.distance, self.speed)
    }
}

/// Travel time in ms for `distance` metres at `speed` m/s, floored at 1 ms.
pub fn travel_time_ms(distance: f64, speed: f64) -> u64 {
    if distance <= 0.0 {
        return 1;
    }
    let ms = (distance / speed.max(f64::MIN_POSITIVE)) * 1000.0;
    (ms.round() as u64).max(1)
}

/// Congestion bounds for edges inside a tagged zone during rush hour.
const RUSH_CONGESTION: (f64, f64) = (0.5, 0.9);
/// Congestion bounds everywhere else.
const FREE_FLOW_CONGESTION: (f64, f64) = (0.9, 1.0);

/// Static road network plus the all-pairs shortest-travel-time tables.
#[derive(Resource)]
pub struct RoadGraph {
    nodes: Vec<RoadNode>,
    edges: Vec<RoadEdge>,
    outgoing: Vec<Vec<EdgeId>>,
    edge_index: HashMap<(NodeId, NodeId), EdgeId>,
    /// travel_time[u][v] in ms; `u64::MAX` when unreachable.
    travel_time: Vec<Vec<u64>>,
    /// Predecessor of `v` on the time-shortest path from `u`.
    predecessor: Vec<Vec<Option<NodeId>>>,
    /// Raw metre length of the time-shortest path from `u` to `v`.
    raw_distance: Vec<Vec<f64>>,
}

impl RoadGraph {
    /// Build the graph and its tables from an ingestion description.
    pub fn from_description(description: &GraphDescription) -> Result<Self, SimError> {
        if description.nodes.is_empty() {
            return Err(SimError::GraphLoad("graph has no nodes".into()));
        }

        let mut index_of = HashMap::with_capacity(description.nodes.len());
        let mut nodes = Vec::with_capacity(description.nodes.len());
        for spec in &description.nodes {
            if index_of.insert(spec.id, nodes.len()).is_some() {
                return Err(SimError::GraphLoad(format!("duplicate node id {}", spec.id)));
            }
            nodes.push(RoadNode {
                x: spec.x,
                y: spec.y,
                is_center: spec.is_center,
                is_residential: spec.is_residential,
            });
        }

        let mut edges: Vec<RoadEdge> = Vec::with_capacity(description.edges.len() * 2);
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut edge_index = HashMap::new();
        for spec in &description.edges {
            if !(spec.distance > 0.0) || !(spec.base_speed > 0.0) {
                return Err(SimError::GraphLoad(format!(
                    "edge {} -> {} has non-positive distance or speed",
                    spec.from, spec.to
                )));
            }
            let from = *index_of
                .get(&spec.from)
                .ok_or_else(|| SimError::GraphLoad(format!("unknown node id {}", spec.from)))?;
            let to = *index_of
                .get(&spec.to)
                .ok_or_else(|| SimError::GraphLoad(format!("unknown node id {}", spec.to)))?;
            if from == to {
                return Err(SimError::GraphLoad(format!("self-loop at node {}", spec.from)));
            }
            // The description lists each road once; insert both directions.
            for (u, v) in [(from, to), (to, from)] {
                if edge_index.contains_key(&(u, v)) {
                    continue;
                }
                let id = edges.len();
                edges.push(RoadEdge {
                    from: u,
                    to: v,
                    distance: spec.distance,
                    base_speed: spec.base_speed,
                    speed: spec.base_speed,
                });
                outgoing[u].push(id);
                edge_index.insert((u, v), id);
            }
        }

        let mut graph = Self {
            nodes,
            edges,
            outgoing,
            edge_index,
            travel_time: Vec::new(),
            predecessor: Vec::new(),
            raw_distance: Vec::new(),
        };
        graph.rebuild_tables();
        Ok(graph)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &RoadNode {
        &self.nodes[id]
    }

    pub fn edge(&self, id: EdgeId) -> &RoadEdge {
        &self.edges[id]
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.edge_index.get(&(from, to)).copied()
    }

    /// Node ids satisfying `predicate`.
    pub fn nodes_where(&self, predicate: impl Fn(&RoadNode) -> bool) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| predicate(&self.nodes[id]))
            .collect()
    }

    /// Shortest travel time from `u` to `v` in ms. 0 when `u == v`,
    /// `f64::INFINITY` when unreachable.
    pub fn dist(&self, u: NodeId, v: NodeId) -> f64 {
        if u == v {
            return 0.0;
        }
        match self.travel_time[u][v] {
            u64::MAX => f64::INFINITY,
            t => t as f64,
        }
    }

    /// Raw metre length of the time-shortest path from `u` to `v`.
    pub fn raw_dist(&self, u: NodeId, v: NodeId) -> f64 {
        if u == v {
            return 0.0;
        }
        self.raw_distance[u][v]
    }

    /// Node sequence of the time-shortest path from `u` to `v`, including
    /// both endpoints. Empty when `u == v` or no path exists.
    pub fn path(&self, u: NodeId, v: NodeId) -> Vec<NodeId> {
        if u == v || self.travel_time[u][v] == u64::MAX {
            return Vec::new();
        }
        let mut path = vec![v];
        let mut current = v;
        while let Some(prev) = self.predecessor[u][current] {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }

    /// Expand a stop sequence into the directed-edge walk that visits each
    /// stop via the current shortest paths. Consecutive duplicate stops are
    /// skipped. `None` when any leg is unreachable.
    pub fn walk_edges(&self, stops: &[NodeId]) -> Option<Vec<EdgeId>> {
        let mut walk = Vec::new();
        let mut nodes = stops.iter().copied();
        let Some(mut at) = nodes.next() else {
            return Some(walk);
        };
        for stop in nodes {
            if stop == at {
                continue;
            }
            let leg = self.path(at, stop);
            if leg.is_empty() {
                return None;
            }
            for pair in leg.windows(2) {
                walk.push(self.edge_index[&(pair[0], pair[1])]);
            }
            at = stop;
        }
        Some(walk)
    }

    /// Resample every edge's live speed and rebuild the shortest-path tables.
    ///
    /// Edges touching a center or residential zone are congested to
    /// 0.5x-0.9x nominal during a rush window; everything else stays in the
    /// 0.9x-1.0x band.
    pub fn update_traffic(&mut self, day_ms: u64, rng: &mut StdRng) {
        let rush = rush_window(day_ms).is_some();
        let congested = Uniform::new(RUSH_CONGESTION.0, RUSH_CONGESTION.1);
        let free_flow = Uniform::new(FREE_FLOW_CONGESTION.0, FREE_FLOW_CONGESTION.1);
        for edge in &mut self.edges {
            let from = &self.nodes[edge.from];
            let to = &self.nodes[edge.to];
            let in_zone = from.is_center
                || from.is_residential
                || to.is_center
                || to.is_residential;
            let factor = if rush && in_zone {
                congested.sample(rng)
            } else {
                free_flow.sample(rng)
            };
            edge.speed = edge.base_speed * factor;
        }
        self.rebuild_tables();
    }

    /// Single-threaded Dijkstra from every source over current edge speeds.
    fn rebuild_tables(&mut self) {
        let n = self.nodes.len();
        let mut travel_time = vec![vec![u64::MAX; n]; n];
        let mut predecessor = vec![vec![None; n]; n];
        let mut raw_distance = vec![vec![f64::INFINITY; n]; n];

        for source in 0..n {
            let reached = dijkstra_all(&source, |&u: &NodeId| {
                self.outgoing[u]
                    .iter()
                    .map(|&e| {
                        let edge = &self.edges[e];
                        (edge.to, edge.travel_time_ms())
                    })
                    .collect::<Vec<_>>()
            });

            travel_time[source][source] = 0;
            raw_distance[source][source] = 0.0;

            // Accumulate raw distances parent-first by visiting nodes in
            // ascending cost order.
            let mut order: Vec<(NodeId, u64)> =
                reached.iter().map(|(&v, &(_, cost))| (v, cost)).collect();
            order.sort_unstable_by_key(|&(v, cost)| (cost, v));
            for (v, cost) in order {
                let parent = reached[&v].0;
                travel_time[source][v] = cost;
                predecessor[source][v] = Some(parent);
                let edge = self.edges[self.edge_index[&(parent, v)]];
                raw_distance[source][v] = raw_distance[source][parent] + edge.distance;
            }
        }

        self.travel_time = travel_time;
        self.predecessor = predecessor;
        self.raw_distance = raw_distance;
    }
}
