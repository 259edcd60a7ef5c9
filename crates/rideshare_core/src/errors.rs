//! Error taxonomy: fatal construction errors vs. routine infeasibility.
//!
//! Routing infeasibility is returned as a value ([RoutingError]) and treated
//! by the matcher as "no candidate"; only construction-time failures
//! ([SimError]) abort a run before the event loop starts.

use thiserror::Error;

/// Fatal, construction-time failures.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to load road graph: {0}")]
    GraphLoad(String),
    #[error("failed to read city metadata: {0}")]
    CityMetadata(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Routine routing outcomes that yield no usable route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The request exceeds the exact solver's city ceiling.
    #[error("route request spans {cities} cities, exceeding the ceiling of {max}")]
    TooManyCities { cities: usize, max: usize },
    /// No walk exists within the caller's cost bound (disconnected pair, or
    /// every completion was pruned by the bound).
    #[error("no feasible route within the cost bound")]
    NoRoute,
}
