//! Test utilities for routing estimators.
//!
//! This module provides [`StubLegEstimator`], a deterministic test double
//! for [`LegEstimator`] that returns pre-configured responses without
//! making actual HTTP requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use carpool_core::{
    Coordinate, EstimateError, LegEstimate, LegEstimator, LegMatrix, MatrixError,
};

/// Stub `LegEstimator` for testing.
///
/// The stub returns pre-configured responses, allowing tests to verify
/// behaviour without requiring a running OSRM service. Clones share one
/// call counter.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use carpool_data::routing::test_support::StubLegEstimator;
/// use carpool_core::{Coordinate, LegEstimate, LegEstimator};
///
/// let leg = LegEstimate::new(900.0, Duration::from_secs(60));
/// let estimator = StubLegEstimator::with_leg(leg);
///
/// let points = [Coordinate { lat: 0.0, lng: 0.0 }, Coordinate { lat: 1.0, lng: 1.0 }];
/// let matrix = estimator.estimate_matrix(&points)?;
/// assert_eq!(matrix[0][1], leg);
/// assert_eq!(estimator.calls(), 1);
/// # Ok::<(), carpool_core::MatrixError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StubLegEstimator {
    response: StubResponse,
    calls: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
enum StubResponse {
    Leg(LegEstimate),
    Matrix(LegMatrix),
    Error(EstimateError),
}

impl StubLegEstimator {
    fn respond(response: StubResponse) -> Self {
        Self {
            response,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer every leg between distinct points with `leg`.
    #[must_use]
    pub fn with_leg(leg: LegEstimate) -> Self {
        Self::respond(StubResponse::Leg(leg))
    }

    /// Return `matrix` for matrix requests, regardless of the points given.
    ///
    /// Single legs are answered from `matrix[0][1]` when present.
    #[must_use]
    pub fn with_matrix(matrix: LegMatrix) -> Self {
        Self::respond(StubResponse::Matrix(matrix))
    }

    /// Fail every non-empty request with `error`.
    #[must_use]
    pub fn with_error(error: EstimateError) -> Self {
        Self::respond(StubResponse::Error(error))
    }

    /// Requests answered so far, counting a matrix as one request.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl LegEstimator for StubLegEstimator {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        self.record();
        match &self.response {
            StubResponse::Error(error) => Err(error.clone()),
            _ if from == to => Ok(LegEstimate::ZERO),
            StubResponse::Leg(leg) => Ok(*leg),
            StubResponse::Matrix(matrix) => matrix
                .first()
                .and_then(|row| row.get(1))
                .copied()
                .ok_or(EstimateError::Unreachable),
        }
    }

    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        if points.is_empty() {
            return Err(MatrixError::Request(EstimateError::EmptyInput));
        }
        self.record();
        match &self.response {
            StubResponse::Matrix(matrix) => Ok(matrix.clone()),
            StubResponse::Error(error) => Err(MatrixError::Request(error.clone())),
            StubResponse::Leg(leg) => Ok(points
                .iter()
                .map(|from| {
                    points
                        .iter()
                        .map(|to| if from == to { LegEstimate::ZERO } else { *leg })
                        .collect()
                })
                .collect()),
        }
    }
}
