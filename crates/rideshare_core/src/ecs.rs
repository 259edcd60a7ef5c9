//! Entity Component System: components and state enums for riders and drivers.
//!
//! Riders and drivers are distinct component types sharing the same id/time
//! bookkeeping style rather than a common tagged union, because their
//! operations diverge sharply: riders are passive lifecycle records, drivers
//! carry a live route and movement state.
//!
//! Costs are travel-time milliseconds throughout (the all-pairs tables'
//! unit), so "distance paid for" and the clock share one scale.

use std::collections::VecDeque;

use bevy_ecs::prelude::{Component, Entity, Resource};

use crate::clock::ONE_MIN_MS;
use crate::graph::{EdgeId, NodeId, RoadGraph};

/// How long an unmatched rider waits before cancelling.
pub const RIDER_CANCEL_DELAY_MS: u64 = 15 * ONE_MIN_MS;

/// Sequential display ids for spawned entities, allocated per world so two
/// simulations never share ids by accident.
#[derive(Debug, Default, Resource)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderState {
    Idle,
    Matched,
    Boarded,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Component)]
pub struct Rider {
    pub id: u64,
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub departure_time: u64,
    /// Unmatched riders give up at this timestamp.
    pub cancel_time: u64,
    /// Party size occupying seats together (1-3).
    pub passenger_count: u32,
    pub state: RiderState,
    pub driver: Option<Entity>,
    pub matched_time: Option<u64>,
    pub boarded_time: Option<u64>,
    pub completed_time: Option<u64>,
    pub cancelled_time: Option<u64>,
    /// Solo travel-time cost from start to end (ms).
    pub baseline_cost: f64,
    /// What the rider currently pays; never above `baseline_cost`.
    pub current_cost: f64,
}

impl Rider {
    pub fn new(
        id: u64,
        start_node: NodeId,
        end_node: NodeId,
        departure_time: u64,
        passenger_count: u32,
        baseline_cost: f64,
    ) -> Self {
        Self {
            id,
            start_node,
            end_node,
            departure_time,
            cancel_time: departure_time + RIDER_CANCEL_DELAY_MS,
            passenger_count,
            state: RiderState::Idle,
            driver: None,
            matched_time: None,
            boarded_time: None,
            completed_time: None,
            cancelled_time: None,
            baseline_cost,
            current_cost: baseline_cost,
        }
    }

    pub fn match_driver(&mut self, driver: Entity, cost: f64, now: u64) {
        self.state = RiderState::Matched;
        self.driver = Some(driver);
        self.matched_time = Some(now);
        self.current_cost = cost;
    }

    pub fn board(&mut self, now: u64) {
        self.state = RiderState::Boarded;
        self.boarded_time = Some(now);
    }

    pub fn complete(&mut self, now: u64) {
        self.state = RiderState::Completed;
        self.completed_time = Some(now);
    }

    pub fn cancel(&mut self, now: u64) {
        self.state = RiderState::Cancelled;
        self.cancelled_time = Some(now);
    }

    /// Idle, past the cancellation deadline, and never matched.
    pub fn should_cancel(&self, now: u64) -> bool {
        self.state == RiderState::Idle && self.matched_time.is_none() && self.cancel_time <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Driving,
    Completed,
}

/// Progress along the directed edge currently being traversed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeProgress {
    pub edge: EdgeId,
    /// Metres already covered on this edge.
    pub traveled: f64,
}

#[derive(Debug, Clone, Component)]
pub struct Driver {
    pub id: u64,
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub departure_time: u64,
    pub passenger_seats: u32,
    /// Seats still free: `passenger_seats` minus the active riders' parties.
    pub vacancies: u32,
    /// Matched and boarded riders currently assigned to this driver.
    pub riders: Vec<Entity>,
    /// Riders already dropped off.
    pub completed_riders: Vec<Entity>,
    pub state: DriverState,
    /// Directed edges not yet entered; `current_edge` precedes them.
    pub route: VecDeque<EdgeId>,
    /// Edge being traversed; `None` exactly when the driver has completed.
    pub current_edge: Option<EdgeProgress>,
    /// Raw metres driven so far.
    pub total_distance: f64,
    /// Travel-time ms spent on fully traversed edges.
    pub progress_cost: f64,
    /// Solo travel-time cost from start to end (ms).
    pub baseline_cost: f64,
    /// What the driver currently pays; non-increasing over the lifetime.
    pub current_cost: f64,
    pub completed_time: Option<u64>,
}

impl Driver {
    /// New driver on its solo route. `None` when start and end are not
    /// connected.
    pub fn new(
        id: u64,
        start_node: NodeId,
        end_node: NodeId,
        departure_time: u64,
        passenger_seats: u32,
        graph: &RoadGraph,
    ) -> Option<Self> {
        let baseline_cost = graph.dist(start_node, end_node);
        if !baseline_cost.is_finite() {
            return None;
        }
        let mut route: VecDeque<EdgeId> =
            graph.walk_edges(&[start_node, end_node])?.into();
        let first = route.pop_front()?;
        Some(Self {
            id,
            start_node,
            end_node,
            departure_time,
            passenger_seats,
            vacancies: passenger_seats,
            riders: Vec::new(),
            completed_riders: Vec::new(),
            state: DriverState::Driving,
            route,
            current_edge: Some(EdgeProgress {
                edge: first,
                traveled: 0.0,
            }),
            total_distance: 0.0,
            progress_cost: 0.0,
            baseline_cost,
            current_cost: baseline_cost,
            completed_time: None,
        })
    }

    /// Node the driver is heading to on its current edge; `None` once
    /// completed.
    pub fn heading_node(&self, graph: &RoadGraph) -> Option<NodeId> {
        self.current_edge.map(|p| graph.edge(p.edge).to)
    }

    /// Travel-time ms already spent plus the remaining time on the current
    /// edge (the cost model's `D_prior`).
    pub fn prior_cost(&self, graph: &RoadGraph) -> f64 {
        let pending = self.current_edge.map_or(0.0, |progress| {
            let edge = graph.edge(progress.edge);
            let remaining = (edge.distance - progress.traveled).max(0.0);
            crate::graph::travel_time_ms(remaining, edge.speed) as f64
        });
        self.progress_cost + pending
    }

    /// Replace the pending route with the edge expansion of `stops`, which
    /// must begin at the current edge's ending node. Returns false (leaving
    /// the old route intact) when a leg is unreachable.
    pub fn install_route(&mut self, graph: &RoadGraph, stops: &[NodeId]) -> bool {
        debug_assert!(
            self.heading_node(graph)
                .map_or(true, |node| Some(&node) == stops.first()),
            "new route must start where the current edge ends"
        );
        match graph.walk_edges(stops) {
            Some(edges) => {
                self.route = edges.into();
                true
            }
            None => false,
        }
    }

    pub fn complete(&mut self, now: u64) {
        self.state = DriverState::Completed;
        self.current_edge = None;
        self.completed_time = Some(now);
    }
}

/// Remaining stop pairs of a driver's assigned riders: `(pickup, dropoff)`
/// while matched, `(dropoff, driver end)` once boarded. This is the
/// precedence-constrained city set fed to the routing kernel when adding
/// riders or re-planning.
pub fn remaining_stop_pairs<'a>(
    driver: &Driver,
    riders: impl Iterator<Item = &'a Rider>,
) -> Vec<(NodeId, NodeId)> {
    riders
        .map(|rider| {
            if rider.state == RiderState::Boarded {
                (rider.end_node, driver.end_node)
            } else {
                (rider.start_node, rider.end_node)
            }
        })
        .collect()
}
