//! Snapshot and result types shared by the matching algorithms.

use bevy_ecs::prelude::Entity;

use crate::graph::NodeId;

/// Frozen view of an idle rider, sufficient to evaluate candidates
/// off-thread.
#[derive(Debug, Clone, Copy)]
pub struct RiderSnapshot {
    pub entity: Entity,
    pub id: u64,
    pub start_node: NodeId,
    pub end_node: NodeId,
    pub passenger_count: u32,
    /// Current cost (the solo baseline while unmatched), ms.
    pub paid: f64,
}

/// Frozen view of a driver eligible for additional riders.
#[derive(Debug, Clone)]
pub struct DriverBrief {
    pub entity: Entity,
    pub id: u64,
    pub end_node: NodeId,
    pub vacancies: u32,
    /// Ending node of the edge currently being traversed; joint routes are
    /// planned from here.
    pub position: NodeId,
    /// Travel time already spent plus the remainder of the current edge
    /// (the cost model's `D_prior`).
    pub prior_cost: f64,
    /// Driver's working cost.
    pub current_cost: f64,
    /// Remaining stop pairs of already-assigned riders: `(pickup, dropoff)`
    /// for matched riders, `(dropoff, driver end)` for boarded ones.
    pub committed_pairs: Vec<(NodeId, NodeId)>,
    /// Sum of the current costs of all assigned and completed riders.
    pub served_paid: f64,
}

/// One driver's proposed rider subset for a match window. Indices point into
/// the window's snapshot lists.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub driver_index: usize,
    pub rider_indices: Vec<usize>,
    pub savings: f64,
    /// City-level stop sequence from the driver's position to its terminal.
    pub stops: Vec<NodeId>,
    pub route_cost: f64,
    /// Swarm iterations it took to settle on this subset.
    pub rounds: u32,
}

/// A priced assignment ready to apply to the world.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub driver: Entity,
    pub driver_cost: f64,
    /// `(rider, new cost)` per committed rider.
    pub riders: Vec<(Entity, f64)>,
    pub stops: Vec<NodeId>,
    pub route_cost: f64,
    pub savings: f64,
}
