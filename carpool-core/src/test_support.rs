//! Deterministic estimators used by unit and behaviour tests across the
//! workspace.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{Coordinate, EstimateError, LegEstimate, LegEstimator, Waypoint};

/// Estimator returning one-kilometre, one-second legs between distinct
/// points.
#[derive(Default, Debug, Copy, Clone)]
pub struct UnitLegEstimator;

impl LegEstimator for UnitLegEstimator {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        if from == to {
            return Ok(LegEstimate::ZERO);
        }
        Ok(LegEstimate::new(1_000.0, Duration::from_secs(1)))
    }
}

/// Estimator that fails legs with a fixed error.
///
/// By default every leg fails; [`FailingLegEstimator::towards`] restricts
/// failures to legs ending at one coordinate and answers the rest like
/// [`UnitLegEstimator`].
#[derive(Debug, Clone)]
pub struct FailingLegEstimator {
    error: EstimateError,
    target: Option<Coordinate>,
}

impl FailingLegEstimator {
    /// Fail every leg with `error`.
    #[must_use]
    pub const fn new(error: EstimateError) -> Self {
        Self {
            error,
            target: None,
        }
    }

    /// Fail only legs that end at `target`.
    #[must_use]
    pub const fn towards(target: Coordinate, error: EstimateError) -> Self {
        Self {
            error,
            target: Some(target),
        }
    }
}

impl LegEstimator for FailingLegEstimator {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        match self.target {
            Some(target) if target != to => UnitLegEstimator.estimate(from, to),
            _ => Err(self.error.clone()),
        }
    }
}

/// Estimator answering from a fixed cost table keyed by coordinate.
///
/// Points not in the table fail with [`EstimateError::Unreachable`]. Every
/// call is counted so tests can assert how often the estimator was used.
#[derive(Debug, Clone)]
pub struct FixedMatrixEstimator {
    points: Vec<Coordinate>,
    legs: Vec<Vec<LegEstimate>>,
    calls: Arc<AtomicUsize>,
}

impl FixedMatrixEstimator {
    /// Build from points and a square table of legs in the same order.
    #[must_use]
    pub fn new(points: Vec<Coordinate>, legs: Vec<Vec<LegEstimate>>) -> Self {
        Self {
            points,
            legs,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build a table where both distance and duration equal `costs[i][j]`
    /// (metres and seconds respectively).
    #[must_use]
    pub fn from_costs(points: Vec<Coordinate>, costs: &[Vec<u32>]) -> Self {
        let legs = costs
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&cost| {
                        LegEstimate::new(f64::from(cost), Duration::from_secs(u64::from(cost)))
                    })
                    .collect()
            })
            .collect();
        Self::new(points, legs)
    }

    /// Number of `estimate` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn index_of(&self, point: Coordinate) -> Option<usize> {
        self.points.iter().position(|candidate| *candidate == point)
    }
}

impl LegEstimator for FixedMatrixEstimator {
    fn estimate(&self, from: Coordinate, to: Coordinate) -> Result<LegEstimate, EstimateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (Some(i), Some(j)) = (self.index_of(from), self.index_of(to)) else {
            return Err(EstimateError::Unreachable);
        };
        self.legs
            .get(i)
            .and_then(|row| row.get(j))
            .copied()
            .ok_or(EstimateError::Unreachable)
    }
}

/// Pickups named `P0`, `P1`, ... at the given coordinates.
#[must_use]
pub fn pickups(points: &[Coordinate]) -> Vec<Waypoint> {
    points
        .iter()
        .enumerate()
        .map(|(index, &location)| Waypoint::pickup(format!("P{index}"), location))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fixed_matrix_counts_calls() {
        let a = Coordinate { lat: 0.0, lng: 0.0 };
        let b = Coordinate { lat: 0.0, lng: 1.0 };
        let estimator = FixedMatrixEstimator::from_costs(vec![a, b], &[vec![0, 7], vec![9, 0]]);
        let leg = estimator.estimate(b, a).expect("leg is in the table");
        assert_eq!(leg.duration, Duration::from_secs(9));
        assert_eq!(estimator.calls(), 1);
    }

    #[rstest]
    fn failing_towards_only_fails_one_target() {
        let a = Coordinate { lat: 0.0, lng: 0.0 };
        let b = Coordinate { lat: 0.0, lng: 1.0 };
        let estimator = FailingLegEstimator::towards(b, EstimateError::Unreachable);
        assert!(estimator.estimate(b, a).is_ok());
        assert_eq!(estimator.estimate(a, b), Err(EstimateError::Unreachable));
    }
}
