//! Post-run statistics roll-up and CSV export.
//!
//! Ratios follow the usual conventions: time averages are over completed
//! entities only, price ratios compare what was paid against the solo
//! baselines (1.0 means nobody shared), and `None` marks ratios whose
//! denominator never materialised.

use std::io::Write;

use bevy_ecs::prelude::World;

use crate::ecs::{Driver, Rider};
use crate::graph::RoadGraph;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationReport {
    pub simulation_runtime_ms: u64,
    pub riders_total: usize,
    pub riders_completed: usize,
    pub riders_cancelled: usize,
    pub rider_completed_ratio: Option<f64>,
    pub rider_cancelled_ratio: Option<f64>,
    /// Departure to dropoff, averaged over completed riders (ms).
    pub rider_avg_trip_ms: Option<f64>,
    /// Departure to match (ms).
    pub rider_avg_matching_ms: Option<f64>,
    /// Match to pickup (ms).
    pub rider_avg_boarding_ms: Option<f64>,
    /// Pickup to dropoff (ms).
    pub rider_avg_traveling_ms: Option<f64>,
    /// Paid / solo baseline over completed riders; below 1.0 means savings.
    pub rider_price_ratio: Option<f64>,
    pub drivers_total: usize,
    pub drivers_completed: usize,
    /// Completed drivers that served at least one rider.
    pub driver_involved_ratio: Option<f64>,
    pub driver_avg_trip_ms: Option<f64>,
    /// Metres driven / solo-route metres over completed drivers.
    pub driver_distance_ratio: Option<f64>,
    /// Paid / solo baseline over completed drivers.
    pub driver_price_ratio: Option<f64>,
    /// Completed riders per seat of completed drivers.
    pub seat_occupancy_rate: Option<f64>,
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

/// Compile the roll-up from the world's terminal state.
pub fn compile_report(world: &mut World) -> SimulationReport {
    let now = world
        .resource::<crate::clock::SimulationClock>()
        .now();

    let riders: Vec<Rider> = world
        .query::<&Rider>()
        .iter(world)
        .cloned()
        .collect();
    let drivers: Vec<Driver> = world
        .query::<&Driver>()
        .iter(world)
        .cloned()
        .collect();
    let graph = world.resource::<RoadGraph>();

    let completed_riders: Vec<&Rider> =
        riders.iter().filter(|r| r.completed_time.is_some()).collect();
    let cancelled = riders.iter().filter(|r| r.cancelled_time.is_some()).count();

    let sum_over = |f: &dyn Fn(&&Rider) -> Option<u64>| -> f64 {
        completed_riders.iter().filter_map(f).sum::<u64>() as f64
    };
    let completed_count = completed_riders.len() as f64;
    let trip_total = sum_over(&|r| Some(r.completed_time? - r.departure_time));
    let matching_total = sum_over(&|r| Some(r.matched_time? - r.departure_time));
    let boarding_total = sum_over(&|r| Some(r.boarded_time? - r.matched_time?));
    let traveling_total = sum_over(&|r| Some(r.completed_time? - r.boarded_time?));
    let rider_paid: f64 = completed_riders.iter().map(|r| r.current_cost).sum();
    let rider_baseline: f64 = completed_riders.iter().map(|r| r.baseline_cost).sum();

    let completed_drivers: Vec<&Driver> = drivers
        .iter()
        .filter(|d| d.completed_time.is_some())
        .collect();
    let involved = completed_drivers
        .iter()
        .filter(|d| !d.completed_riders.is_empty())
        .count();
    let driver_trip_total: f64 = completed_drivers
        .iter()
        .filter_map(|d| d.completed_time.map(|t| t - d.departure_time))
        .sum::<u64>() as f64;
    let driver_driven: f64 = completed_drivers.iter().map(|d| d.total_distance).sum();
    let driver_solo_metres: f64 = completed_drivers
        .iter()
        .map(|d| graph.raw_dist(d.start_node, d.end_node))
        .filter(|m| m.is_finite())
        .sum();
    let driver_paid: f64 = completed_drivers.iter().map(|d| d.current_cost).sum();
    let driver_baseline: f64 = completed_drivers.iter().map(|d| d.baseline_cost).sum();
    let seats: f64 = completed_drivers
        .iter()
        .map(|d| d.passenger_seats as f64)
        .sum();

    SimulationReport {
        simulation_runtime_ms: now,
        riders_total: riders.len(),
        riders_completed: completed_riders.len(),
        riders_cancelled: cancelled,
        rider_completed_ratio: ratio(completed_count, riders.len() as f64),
        rider_cancelled_ratio: ratio(cancelled as f64, riders.len() as f64),
        rider_avg_trip_ms: ratio(trip_total, completed_count),
        rider_avg_matching_ms: ratio(matching_total, completed_count),
        rider_avg_boarding_ms: ratio(boarding_total, completed_count),
        rider_avg_traveling_ms: ratio(traveling_total, completed_count),
        rider_price_ratio: ratio(rider_paid, rider_baseline),
        drivers_total: drivers.len(),
        drivers_completed: completed_drivers.len(),
        driver_involved_ratio: ratio(involved as f64, completed_drivers.len() as f64),
        driver_avg_trip_ms: ratio(driver_trip_total, completed_drivers.len() as f64),
        driver_distance_ratio: ratio(driver_driven, driver_solo_metres),
        driver_price_ratio: ratio(driver_paid, driver_baseline),
        seat_occupancy_rate: ratio(completed_count, seats),
    }
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| format!("{v:.4}"))
}

/// Write the report as one CSV header row plus one value row.
pub fn write_csv<W: Write>(report: &SimulationReport, writer: W) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "simulation_runtime_ms",
        "riders_total",
        "riders_completed",
        "riders_cancelled",
        "rider_completed_ratio",
        "rider_cancelled_ratio",
        "rider_avg_trip_ms",
        "rider_avg_matching_ms",
        "rider_avg_boarding_ms",
        "rider_avg_traveling_ms",
        "rider_price_ratio",
        "drivers_total",
        "drivers_completed",
        "driver_involved_ratio",
        "driver_avg_trip_ms",
        "driver_distance_ratio",
        "driver_price_ratio",
        "seat_occupancy_rate",
    ])?;
    out.write_record([
        report.simulation_runtime_ms.to_string(),
        report.riders_total.to_string(),
        report.riders_completed.to_string(),
        report.riders_cancelled.to_string(),
        cell(report.rider_completed_ratio),
        cell(report.rider_cancelled_ratio),
        cell(report.rider_avg_trip_ms),
        cell(report.rider_avg_matching_ms),
        cell(report.rider_avg_boarding_ms),
        cell(report.rider_avg_traveling_ms),
        cell(report.rider_price_ratio),
        report.drivers_total.to_string(),
        report.drivers_completed.to_string(),
        cell(report.driver_involved_ratio),
        cell(report.driver_avg_trip_ms),
        cell(report.driver_distance_ratio),
        cell(report.driver_price_ratio),
        cell(report.seat_occupancy_rate),
    ])?;
    out.flush()?;
    Ok(())
}
