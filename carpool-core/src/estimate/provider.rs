//! Leg estimator trait and the matrix alias built from it.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Coordinate;

use super::error::{EstimateError, MatrixError};

/// Distance and travel time for one leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegEstimate {
    /// Distance in metres.
    pub distance_m: f64,
    /// Travel time.
    #[serde(rename = "duration_s", with = "crate::serde_secs")]
    pub duration: Duration,
}

impl LegEstimate {
    /// A leg from a point to itself.
    pub const ZERO: Self = Self {
        distance_m: 0.0,
        duration: Duration::ZERO,
    };

    /// Construct a leg estimate.
    #[must_use]
    pub const fn new(distance_m: f64, duration: Duration) -> Self {
        Self {
            distance_m,
            duration,
        }
    }
}

/// Square matrix of leg estimates; `matrix[i][j]` runs from point `i` to `j`.
pub type LegMatrix = Vec<Vec<LegEstimate>>;

/// Estimate distance and travel time between coordinates.
///
/// Implementers must provide [`LegEstimator::estimate`]. The default
/// [`LegEstimator::estimate_matrix`] calls it for every ordered pair;
/// network-backed estimators override it with a single batched request.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use carpool_core::{Coordinate, EstimateError, LegEstimate, LegEstimator};
///
/// struct Flat;
///
/// impl LegEstimator for Flat {
///     fn estimate(&self, _: Coordinate, _: Coordinate) -> Result<LegEstimate, EstimateError> {
///         Ok(LegEstimate::new(1_000.0, Duration::from_secs(60)))
///     }
/// }
///
/// let points = [Coordinate { lat: 0.0, lng: 0.0 }, Coordinate { lat: 0.0, lng: 1.0 }];
/// let matrix = Flat.estimate_matrix(&points)?;
/// assert_eq!(matrix[0][0], LegEstimate::ZERO);
/// assert_eq!(matrix[0][1].duration, Duration::from_secs(60));
/// # Ok::<(), carpool_core::MatrixError>(())
/// ```
pub trait LegEstimator {
    /// Estimate travel from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`EstimateError`] when the leg cannot be estimated.
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError>;

    /// Estimate every ordered pair of `points`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::Request`] wrapping
    /// [`EstimateError::EmptyInput`] when `points` is empty, and
    /// [`MatrixError::Leg`] naming the first leg that failed.
    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        if points.is_empty() {
            return Err(MatrixError::Request(EstimateError::EmptyInput));
        }
        points
            .iter()
            .enumerate()
            .map(|(from, &origin)| {
                points
                    .iter()
                    .enumerate()
                    .map(|(to, &target)| {
                        if from == to {
                            return Ok(LegEstimate::ZERO);
                        }
                        self.estimate(origin, target)
                            .map_err(|source| MatrixError::Leg { from, to, source })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

impl<T: LegEstimator + ?Sized> LegEstimator for &T {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        (**self).estimate(from, to)
    }

    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        (**self).estimate_matrix(points)
    }
}

impl<T: LegEstimator + ?Sized> LegEstimator for Box<T> {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        (**self).estimate(from, to)
    }

    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        (**self).estimate_matrix(points)
    }
}

impl<T: LegEstimator + ?Sized> LegEstimator for Arc<T> {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        (**self).estimate(from, to)
    }

    fn estimate_matrix(&self, points: &[Coordinate]) -> Result<LegMatrix, MatrixError> {
        (**self).estimate_matrix(points)
    }
}

/// Check that `matrix` is `expected x expected`.
///
/// # Errors
///
/// Returns [`MatrixError::Shape`] describing the first mismatch.
pub fn check_matrix_shape(matrix: &[Vec<LegEstimate>], expected: usize) -> Result<(), MatrixError> {
    let shape_error = |columns| MatrixError::Shape {
        rows: matrix.len(),
        columns,
        expected,
    };
    if matrix.len() != expected {
        return Err(shape_error(matrix.first().map_or(0, Vec::len)));
    }
    match matrix.iter().find(|row| row.len() != expected) {
        Some(row) => Err(shape_error(row.len())),
        None => Ok(()),
    }
}
