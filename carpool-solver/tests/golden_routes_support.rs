//! Shared utilities for golden route tests.
//!
//! This module contains data structures and helper functions used by both
//! the rstest parameterised tests and the BDD behavioural tests.
//!
//! Each fixture stores a request and a square cost table whose rows follow
//! the request layout: origin, pickups in input order, destination. Costs
//! are used as both metres and seconds.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use carpool_core::test_support::FixedMatrixEstimator;
use carpool_core::{Objective, SearchStrategy, SequenceRequest, SequenceResponse};
use carpool_solver::{SequencerConfig, WaypointSequencer};
use serde::Deserialize;

/// Deserialised golden route test case.
#[derive(Debug, Deserialize, Clone)]
#[expect(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    reason = "fields are used by some test binaries but not others"
)]
pub struct GoldenRoute {
    /// Name of the test case (used in error messages).
    pub name: String,
    /// Human-readable description of what the test validates.
    #[allow(dead_code)]
    pub description: String,
    /// Request to sequence.
    pub request: SequenceRequest,
    /// Leg costs in request order.
    pub costs: Vec<Vec<u32>>,
    /// Objective override; duration when absent.
    #[serde(default)]
    pub objective: Option<Objective>,
    /// Expected results for validation.
    pub expected: ExpectedResult,
}

/// Expected result from JSON.
#[derive(Debug, Deserialize, Clone)]
pub struct ExpectedResult {
    /// Pickup names in visiting order.
    pub order: Vec<String>,
    /// Total route duration in seconds.
    pub total_duration_s: u64,
    /// Search expected to run.
    pub strategy: SearchStrategy,
}

/// Load a golden route from the data directory by name (without extension).
///
/// # Panics
///
/// Panics if the file cannot be read or parsed.
#[must_use]
pub fn load_golden_route(name: &str) -> GoldenRoute {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/golden_routes/data")
        .join(format!("{name}.json"));
    let content = fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!(
            "failed to read golden route file at {}: {}",
            path.display(),
            e
        )
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        panic!(
            "failed to parse golden route JSON at {}: {}",
            path.display(),
            e
        )
    })
}

/// Sequencer answering from the golden route's cost table.
#[must_use]
pub fn build_sequencer(golden: &GoldenRoute) -> WaypointSequencer<FixedMatrixEstimator> {
    let estimator = FixedMatrixEstimator::from_costs(golden.request.points(), &golden.costs);
    let config = SequencerConfig::default().with_objective(golden.objective.unwrap_or_default());
    WaypointSequencer::with_config(estimator, config)
}

/// Pickup names in the order the response visits them.
#[must_use]
pub fn visiting_order(response: &SequenceResponse) -> Vec<String> {
    response
        .route
        .pickups()
        .map(|waypoint| waypoint.name.clone())
        .collect()
}

/// Expected total duration.
#[must_use]
pub const fn expected_duration(expected: &ExpectedResult) -> Duration {
    Duration::from_secs(expected.total_duration_s)
}
