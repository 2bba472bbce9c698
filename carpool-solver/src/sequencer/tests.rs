//! Tests for the `WaypointSequencer`.

use std::time::Duration;

use carpool_core::test_support::{
    FailingLegEstimator, FixedMatrixEstimator, UnitLegEstimator, pickups,
};
use carpool_core::{
    Coordinate, EstimateError, HaversineEstimator, InvalidInputError, RouteConstraints,
    SearchStrategy, SequenceRequest, TimeWindow,
};
use rstest::rstest;

use super::*;
use crate::test_support::{dallas_request, grid, request_between};

fn point(lat: f64, lng: f64) -> Coordinate {
    Coordinate { lat, lng }
}

fn names(response: &SequenceResponse) -> Vec<&str> {
    response
        .route
        .waypoints()
        .iter()
        .map(|waypoint| waypoint.name.as_str())
        .collect()
}

/// Origin, three pickups and a destination whose input order is not the
/// cheapest.
fn scrambled() -> (SequenceRequest, FixedMatrixEstimator) {
    let points = grid(5);
    let request = request_between(points[0], &points[1..4], points[4]);
    // Optimal order is P2, P0, P1 (cost 1 + 1 + 1 + 1).
    let costs = vec![
        vec![0, 5, 9, 1, 9],
        vec![5, 0, 1, 9, 9],
        vec![9, 1, 0, 9, 1],
        vec![1, 1, 9, 0, 9],
        vec![9, 9, 1, 9, 0],
    ];
    let estimator = FixedMatrixEstimator::from_costs(points, &costs);
    (request, estimator)
}

#[rstest]
fn zero_pickups_returns_the_direct_leg() {
    let request = request_between(point(0.0, 0.0), &[], point(0.0, 0.1));
    let sequencer = WaypointSequencer::new(UnitLegEstimator);

    let response = sequencer.sequence(&request).expect("direct route");

    assert_eq!(names(&response), ["Driver", "Destination"]);
    assert_eq!(response.route.total_duration(), Duration::from_secs(1));
    assert_eq!(response.diagnostics.strategy, SearchStrategy::Direct);
}

#[rstest]
fn one_pickup_costs_both_legs() {
    let request = request_between(point(0.0, 0.0), &[point(0.0, 0.05)], point(0.0, 0.1));
    let sequencer = WaypointSequencer::new(UnitLegEstimator);

    let response = sequencer.sequence(&request).expect("single pickup route");

    assert_eq!(names(&response), ["Driver", "P0", "Destination"]);
    assert_eq!(response.route.total_distance_m(), 2_000.0);
    assert_eq!(response.route.total_duration(), Duration::from_secs(2));
}

#[rstest]
fn exhaustive_search_finds_the_cheapest_order() {
    let (request, estimator) = scrambled();
    let sequencer = WaypointSequencer::new(estimator);

    let response = sequencer.sequence(&request).expect("route");

    assert_eq!(names(&response), ["Driver", "P2", "P0", "P1", "Destination"]);
    assert_eq!(response.route.total_duration(), Duration::from_secs(4));
    assert_eq!(response.baseline.duration, Duration::from_secs(24));
    assert_eq!(response.diagnostics.strategy, SearchStrategy::Exhaustive);
    assert_eq!(response.diagnostics.orders_evaluated, 6);
}

#[rstest]
fn heuristic_is_used_above_the_exhaustive_limit() {
    let (request, estimator) = scrambled();
    let config = SequencerConfig::default().with_exhaustive_limit(2);
    let sequencer = WaypointSequencer::with_config(estimator, config);

    let response = sequencer.sequence(&request).expect("route");

    assert_eq!(
        response.diagnostics.strategy,
        SearchStrategy::NearestNeighbourTwoOpt
    );
    assert!(response.route.total_duration() <= response.baseline.duration);
}

#[rstest]
fn the_matrix_is_requested_once() {
    let (request, estimator) = scrambled();
    let sequencer = WaypointSequencer::new(estimator);

    sequencer.sequence(&request).expect("route");

    // The default matrix implementation asks for every off-diagonal pair.
    assert_eq!(sequencer.estimator().calls(), 20);
}

#[rstest]
fn dallas_route_is_no_longer_than_input_order() {
    let sequencer = WaypointSequencer::new(HaversineEstimator::default());

    let response = sequencer.sequence(&dallas_request()).expect("Dallas route");

    assert_eq!(response.route.waypoints().len(), 4);
    assert_eq!(names(&response).first(), Some(&"Driver"));
    assert_eq!(names(&response).last(), Some(&"Destination"));
    assert!(response.route.total_distance_m() <= response.baseline.distance_m);
}

#[rstest]
fn identical_requests_give_identical_orders() {
    let points = grid(8);
    let request = request_between(points[0], &points[1..7], points[7]);
    let sequencer = WaypointSequencer::new(HaversineEstimator::default());

    let first = sequencer.sequence(&request).expect("route");
    let second = sequencer.sequence(&request).expect("route");

    assert_eq!(first.route, second.route);
}

#[rstest]
fn invalid_coordinates_are_rejected_before_estimation() {
    let (mut request, estimator) = scrambled();
    request.pickups[1].location.lng = -181.0;
    let sequencer = WaypointSequencer::new(estimator);

    let err = sequencer.sequence(&request).expect_err("longitude is invalid");

    match err {
        SequenceError::InvalidInput(InvalidInputError::InvalidCoordinate { waypoint, .. }) => {
            assert_eq!(waypoint.name, "P1");
        }
        other => panic!("expected InvalidCoordinate, got {other:?}"),
    }
    assert_eq!(sequencer.estimator().calls(), 0);
}

#[rstest]
fn failed_legs_name_the_waypoint_they_lead_to() {
    let request = request_between(
        point(0.0, 0.0),
        &[point(0.0, 0.01), point(0.0, 0.02)],
        point(0.0, 0.03),
    );
    let estimator = FailingLegEstimator::towards(point(0.0, 0.02), EstimateError::Unreachable);
    let sequencer = WaypointSequencer::new(estimator);

    let err = sequencer.sequence(&request).expect_err("P1 is unreachable");

    match err {
        SequenceError::RouteComputation(RouteComputationError { waypoint, source }) => {
            assert_eq!(waypoint.name, "P1");
            assert_eq!(source.leg(), Some((0, 2)));
        }
        other => panic!("expected RouteComputation, got {other:?}"),
    }
}

#[rstest]
fn whole_matrix_failures_are_attributed_to_the_origin() {
    let points = grid(3);
    let request = request_between(points[0], &points[1..2], points[2]);
    // Table sized for two points only.
    let estimator = MisSized;
    let sequencer = WaypointSequencer::new(estimator);

    let err = sequencer.sequence(&request).expect_err("matrix has the wrong shape");

    match err {
        SequenceError::RouteComputation(RouteComputationError { waypoint, source }) => {
            assert_eq!(waypoint.name, "Driver");
            assert!(matches!(source, MatrixError::Shape { expected: 3, .. }));
        }
        other => panic!("expected RouteComputation, got {other:?}"),
    }
}

struct MisSized;

impl LegEstimator for MisSized {
    fn estimate(
        &self,
        _: Coordinate,
        _: Coordinate,
    ) -> Result<carpool_core::LegEstimate, EstimateError> {
        Ok(carpool_core::LegEstimate::ZERO)
    }

    fn estimate_matrix(
        &self,
        _: &[Coordinate],
    ) -> Result<carpool_core::LegMatrix, MatrixError> {
        Ok(vec![vec![carpool_core::LegEstimate::ZERO; 2]; 2])
    }
}

#[rstest]
fn distance_limit_rejects_long_routes() {
    let (request, estimator) = scrambled();
    let constrained = request.with_constraints(RouteConstraints {
        max_total_distance_m: Some(3.0),
        ..RouteConstraints::default()
    });
    let sequencer = WaypointSequencer::new(estimator);

    let err = sequencer.sequence(&constrained).expect_err("best route is 4 m");

    assert_eq!(
        err,
        SequenceError::DistanceLimitExceeded {
            distance_m: 4.0,
            limit_m: 3.0,
        }
    );
}

#[rstest]
fn passenger_limit_is_checked() {
    let (request, estimator) = scrambled();
    let constrained = request.with_constraints(RouteConstraints {
        max_passengers: Some(2),
        ..RouteConstraints::default()
    });
    let sequencer = WaypointSequencer::new(estimator);

    let err = sequencer.sequence(&constrained).expect_err("three pickups, two seats");

    assert!(matches!(
        err,
        SequenceError::InvalidInput(InvalidInputError::TooManyPickups { count: 3, max: 2 })
    ));
}

#[rstest]
fn time_windows_do_not_change_the_route() {
    let (request, estimator) = scrambled();
    let sequencer = WaypointSequencer::new(estimator);
    let plain = sequencer.sequence(&request).expect("route");

    let windowed = request.with_constraints(RouteConstraints {
        time_windows: vec![TimeWindow {
            pickup: "P1".to_owned(),
            earliest: None,
            latest: Some(Duration::from_secs(1)),
        }],
        ..RouteConstraints::default()
    });
    let constrained = sequencer.sequence(&windowed).expect("route");

    assert_eq!(plain.route, constrained.route);
}

/// Two pickups where input order P0, P1 is short but slow (3 m) and
/// P1, P0 is long but fast (150 m).
fn short_or_fast() -> (SequenceRequest, Vec<Coordinate>, carpool_core::LegMatrix) {
    let points = grid(4);
    let request = request_between(points[0], &points[1..3], points[3]);
    let slow = Duration::from_secs(100);
    let fast = Duration::from_secs(1);
    let leg = carpool_core::LegEstimate::new;
    let legs = vec![
        vec![leg(0.0, Duration::ZERO), leg(1.0, slow), leg(50.0, fast), leg(50.0, fast)],
        vec![leg(1.0, slow), leg(0.0, Duration::ZERO), leg(1.0, slow), leg(50.0, fast)],
        vec![leg(50.0, fast), leg(1.0, slow), leg(0.0, Duration::ZERO), leg(1.0, slow)],
        vec![leg(50.0, fast), leg(50.0, fast), leg(1.0, slow), leg(0.0, Duration::ZERO)],
    ];
    (request, points, legs)
}

#[rstest]
fn distance_objective_can_pick_a_slower_route() {
    let (request, points, legs) = short_or_fast();
    let by_duration = WaypointSequencer::new(FixedMatrixEstimator::new(points.clone(), legs.clone()));
    let by_distance = WaypointSequencer::with_config(
        FixedMatrixEstimator::new(points, legs),
        SequencerConfig::default().with_objective(Objective::Distance),
    );

    let fastest = by_duration.sequence(&request).expect("route");
    let shortest = by_distance.sequence(&request).expect("route");

    assert_eq!(names(&fastest), ["Driver", "P1", "P0", "Destination"]);
    assert_eq!(names(&shortest), ["Driver", "P0", "P1", "Destination"]);
}

#[rstest]
#[case::exhaustive(SequencerConfig::default())]
#[case::heuristic(SequencerConfig::default().with_exhaustive_limit(0))]
fn distance_limit_selects_a_slower_order_that_fits(#[case] config: SequencerConfig) {
    let (request, points, legs) = short_or_fast();
    let constrained = request.with_constraints(RouteConstraints {
        max_total_distance_m: Some(100.0),
        ..RouteConstraints::default()
    });
    let sequencer = WaypointSequencer::with_config(FixedMatrixEstimator::new(points, legs), config);

    let response = sequencer
        .sequence(&constrained)
        .expect("the slower order is 3 m long");

    assert_eq!(names(&response), ["Driver", "P0", "P1", "Destination"]);
    assert_eq!(response.route.total_distance_m(), 3.0);
}

#[rstest]
fn pickups_helper_names_in_input_order() {
    let named = pickups(&grid(2));
    assert_eq!(named[0].name, "P0");
    assert_eq!(named[1].name, "P1");
}
