//! `WaypointSequencer` implementation.
//!
//! Fetches one leg matrix per request, then searches visiting orders over
//! it; the estimator is never consulted during the search itself.

use std::time::Instant;

use carpool_core::{
    Diagnostics, LegEstimator, MatrixError, Objective, Route, RouteComputationError,
    SequenceError, SequenceRequest, SequenceResponse, Sequencer, Waypoint, check_matrix_shape,
};

use crate::search::{self, Costs, Outcome, OverLimit};

/// Largest pickup count solved exhaustively by default (8! orders).
pub const DEFAULT_EXHAUSTIVE_LIMIT: usize = 8;

/// Default bound on 2-opt sweeps for larger requests.
const DEFAULT_TWO_OPT_PASSES: usize = 32;

/// Configuration for [`WaypointSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Cost minimised first; the other measure breaks ties.
    pub objective: Objective,
    /// Pickup counts up to this are searched exhaustively.
    pub exhaustive_limit: usize,
    /// Upper bound on 2-opt improvement sweeps.
    pub max_two_opt_passes: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            objective: Objective::Duration,
            exhaustive_limit: DEFAULT_EXHAUSTIVE_LIMIT,
            max_two_opt_passes: DEFAULT_TWO_OPT_PASSES,
        }
    }
}

impl SequencerConfig {
    /// Set the objective.
    #[must_use]
    pub const fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    /// Set the exhaustive search limit.
    #[must_use]
    pub const fn with_exhaustive_limit(mut self, limit: usize) -> Self {
        self.exhaustive_limit = limit;
        self
    }

    /// Set the 2-opt sweep bound.
    #[must_use]
    pub const fn with_max_two_opt_passes(mut self, passes: usize) -> Self {
        self.max_two_opt_passes = passes;
        self
    }
}

/// Sequencer ordering pickups to minimise total travel.
///
/// Small requests are solved exactly by enumerating every visiting order;
/// larger ones use nearest-neighbour construction refined by 2-opt. Either
/// way the result is deterministic and never costs more than visiting the
/// pickups in input order.
///
/// # Examples
/// ```
/// use carpool_core::{Coordinate, HaversineEstimator, SequenceRequest, Sequencer, Waypoint};
/// use carpool_solver::WaypointSequencer;
///
/// let sequencer = WaypointSequencer::new(HaversineEstimator::default());
/// let request = SequenceRequest::new(
///     Waypoint::origin("home", Coordinate { lat: 32.7767, lng: -96.7970 }),
///     vec![
///         Waypoint::pickup("ana", Coordinate { lat: 32.80, lng: -96.80 }),
///         Waypoint::pickup("ben", Coordinate { lat: 32.75, lng: -96.75 }),
///     ],
///     Waypoint::destination("office", Coordinate { lat: 32.90, lng: -96.70 }),
/// );
///
/// let response = sequencer.sequence(&request)?;
/// assert_eq!(response.route.waypoints().len(), 4);
/// assert!(response.route.total_distance_m() <= response.baseline.distance_m);
/// # Ok::<(), carpool_core::SequenceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WaypointSequencer<E> {
    estimator: E,
    config: SequencerConfig,
}

impl<E: LegEstimator> WaypointSequencer<E> {
    /// Construct a sequencer using default configuration.
    #[must_use]
    pub fn new(estimator: E) -> Self {
        Self::with_config(estimator, SequencerConfig::default())
    }

    /// Construct a sequencer with explicit configuration.
    #[must_use]
    pub const fn with_config(estimator: E, config: SequencerConfig) -> Self {
        Self { estimator, config }
    }

    /// The estimator legs are requested from.
    #[must_use]
    pub const fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SequencerConfig {
        &self.config
    }

    fn search(&self, costs: &Costs) -> Result<Outcome, OverLimit> {
        if costs.pickups() <= self.config.exhaustive_limit {
            search::exhaustive(costs)
        } else {
            search::nearest_neighbour_two_opt(costs, self.config.max_two_opt_passes)
        }
    }
}

impl<E> Sequencer for WaypointSequencer<E>
where
    E: LegEstimator + Send + Sync,
{
    fn sequence(&self, request: &SequenceRequest) -> Result<SequenceResponse, SequenceError> {
        request.validate()?;
        let started_at = Instant::now();

        let waypoints: Vec<Waypoint> = request.waypoints().cloned().collect();
        let points = request.points();
        let matrix = self
            .estimator
            .estimate_matrix(&points)
            .and_then(|matrix| check_matrix_shape(&matrix, points.len()).map(|()| matrix))
            .map_err(|source| attribute(request, &waypoints, source))?;

        let costs = Costs::new(matrix, self.config.objective)
            .with_distance_limit(request.constraints.max_total_distance_m);
        let baseline = costs.order_cost(&search::input_order(costs.pickups()));
        let outcome = self.search(&costs).map_err(|over| {
            SequenceError::DistanceLimitExceeded {
                distance_m: over.shortest_distance_m,
                limit_m: over.limit_m,
            }
        })?;

        if !request.constraints.time_windows.is_empty() {
            log::debug!(
                "ignoring {} pickup time window(s); windows do not affect ordering",
                request.constraints.time_windows.len()
            );
        }

        let stops = costs.stops(&outcome.order);
        let legs = stops
            .windows(2)
            .filter_map(|pair| match pair {
                [from, to] => Some(costs.leg(*from, *to)),
                _ => None,
            })
            .collect();
        let ordered = stops
            .iter()
            .filter_map(|&index| waypoints.get(index).cloned())
            .collect();
        let route = Route::from_legs(ordered, legs)?;

        Ok(SequenceResponse {
            route,
            baseline,
            diagnostics: Diagnostics {
                strategy: outcome.strategy,
                orders_evaluated: outcome.orders_evaluated,
                solve_time: started_at.elapsed(),
            },
        })
    }
}

/// Blame the waypoint a failed leg leads to; whole-matrix failures are
/// attributed to the origin.
fn attribute(
    request: &SequenceRequest,
    waypoints: &[Waypoint],
    source: MatrixError,
) -> RouteComputationError {
    let waypoint = source
        .leg()
        .and_then(|(_, to)| waypoints.get(to))
        .unwrap_or(&request.origin)
        .clone();
    RouteComputationError {
        waypoint: Box::new(waypoint),
        source,
    }
}

#[cfg(test)]
mod tests;
