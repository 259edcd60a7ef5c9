//! Matching algorithm trait.

use crate::graph::RoadGraph;
use crate::matching::types::{Assignment, DriverBrief, RiderSnapshot};

/// Strategy interface for one match window.
///
/// Implementations read only the frozen snapshots and the graph's published
/// tables; all world mutation happens in the match-window system applying
/// the returned assignments. Guarantees every implementation must uphold:
///
/// - each rider appears in at most one assignment;
/// - each assignment fits the driver's vacancies;
/// - each assignment's savings are non-negative;
/// - identical inputs and `seed`/`window` produce identical output.
pub trait MatchingAlgorithm: Send + Sync {
    fn name(&self) -> &'static str;

    /// Propose assignments for one window. `seed` is the master random seed
    /// and `window` the match-window counter; stochastic implementations
    /// derive their per-driver streams from both.
    fn propose(
        &self,
        graph: &RoadGraph,
        drivers: &[DriverBrief],
        riders: &[RiderSnapshot],
        seed: u64,
        window: u64,
    ) -> Vec<Assignment>;
}
