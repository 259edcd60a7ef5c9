//! Cost model: savings of a joint route and the driver/rider fare split.
//!
//! All quantities are travel-time milliseconds. The driver's working cost
//! (`driver_current`) equals the solo baseline until the first match and only
//! ever decreases afterwards, so repeated matches compound correctly and the
//! conservation invariant holds:
//!
//! `driver_cost + sum(all rider costs) == D_prior + C_total`
//!
//! where `D_prior` is the travel time already spent and `C_total` the joint
//! route's remaining cost.

/// Outcome of pricing a batch of joining riders onto a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct FareSplit {
    /// Total reduction versus everyone travelling solo. Non-negative.
    pub savings: f64,
    /// Driver's new working cost.
    pub driver_cost: f64,
    /// New cost per joining rider, aligned with the input order.
    pub rider_costs: Vec<f64>,
}

/// Marginal cost of the remaining joint trip: what is still unpaid after
/// crediting the fares already owed by on-board and completed riders.
pub fn remaining_cost(prior_cost: f64, route_cost: f64, served_paid: f64) -> f64 {
    prior_cost + route_cost - served_paid
}

/// Held-Karp cost bound that makes a candidate exactly break even: any route
/// at or above it yields negative savings, so the solver can prune there.
pub fn break_even_route_cost(
    driver_current: f64,
    joining_paid_sum: f64,
    prior_cost: f64,
    served_paid: f64,
) -> f64 {
    driver_current + joining_paid_sum - prior_cost + served_paid
}

/// Price a joint trip. `joining_paid` are the joining riders' current costs
/// (their baselines when still unmatched); `c_remaining` comes from
/// [remaining_cost]. Returns `None` when the pooled trip does not beat the
/// solo baselines.
pub fn split_fares(driver_current: f64, joining_paid: &[f64], c_remaining: f64) -> Option<FareSplit> {
    let joining_sum: f64 = joining_paid.iter().sum();
    let savings = driver_current + joining_sum - c_remaining;
    if savings < 0.0 || joining_paid.is_empty() {
        return None;
    }
    let half = savings * 0.5;
    let rider_costs = joining_paid
        .iter()
        .map(|&paid| paid - half * (paid / joining_sum))
        .collect();
    Some(FareSplit {
        savings,
        driver_cost: driver_current - half,
        rider_costs,
    })
}
