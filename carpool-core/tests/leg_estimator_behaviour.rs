#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for `LegEstimator` implementations.

use carpool_core::{
    Coordinate, EstimateError, HaversineEstimator, LegEstimate, LegEstimator, LegMatrix,
    MatrixError, test_support::UnitLegEstimator,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

const LAS_VEGAS: Coordinate = Coordinate {
    lat: 36.17,
    lng: -115.14,
};
const LOS_ANGELES: Coordinate = Coordinate {
    lat: 34.05,
    lng: -118.24,
};

#[fixture]
fn estimator() -> UnitLegEstimator {
    UnitLegEstimator
}

#[fixture]
fn result() -> RefCell<Result<LegMatrix, MatrixError>> {
    RefCell::new(Ok(Vec::new()))
}

#[fixture]
fn leg() -> RefCell<Option<Result<LegEstimate, EstimateError>>> {
    RefCell::new(None)
}

#[given("an estimator returning unit legs")]
fn given_estimator(
    #[from(estimator)] _estimator: &UnitLegEstimator,
    #[from(result)] result: &RefCell<Result<LegMatrix, MatrixError>>,
) {
    *result.borrow_mut() = Ok(Vec::new());
}

#[when("I request a matrix for two points")]
fn request_two(
    #[from(estimator)] estimator: &UnitLegEstimator,
    #[from(result)] result: &RefCell<Result<LegMatrix, MatrixError>>,
) {
    let points = [LAS_VEGAS, LOS_ANGELES];
    *result.borrow_mut() = estimator.estimate_matrix(&points);
}

#[when("I request a matrix for no points")]
fn request_none(
    #[from(estimator)] estimator: &UnitLegEstimator,
    #[from(result)] result: &RefCell<Result<LegMatrix, MatrixError>>,
) {
    *result.borrow_mut() = estimator.estimate_matrix(&[]);
}

#[then("a 2x2 matrix is returned")]
fn then_matrix(#[from(result)] result: &RefCell<Result<LegMatrix, MatrixError>>) {
    let borrow = result.borrow();
    let matrix = borrow.as_ref().expect("expected Ok result");
    assert_eq!(matrix.len(), 2);
    assert!(matrix.iter().all(|row| row.len() == 2));
}

#[then("the diagonal is free")]
fn then_diagonal(#[from(result)] result: &RefCell<Result<LegMatrix, MatrixError>>) {
    let borrow = result.borrow();
    let matrix = borrow.as_ref().expect("expected Ok result");
    for (index, row) in matrix.iter().enumerate() {
        assert_eq!(row.get(index), Some(&LegEstimate::ZERO));
    }
}

#[then("an empty input error is returned")]
fn then_error(#[from(result)] result: &RefCell<Result<LegMatrix, MatrixError>>) {
    assert_eq!(
        *result.borrow(),
        Err(MatrixError::Request(EstimateError::EmptyInput))
    );
}

#[given("the default haversine estimator")]
fn given_haversine(#[from(leg)] leg: &RefCell<Option<Result<LegEstimate, EstimateError>>>) {
    *leg.borrow_mut() = None;
}

#[when("I estimate Las Vegas to Los Angeles")]
fn estimate_city_pair(#[from(leg)] leg: &RefCell<Option<Result<LegEstimate, EstimateError>>>) {
    *leg.borrow_mut() = Some(HaversineEstimator::default().estimate(LAS_VEGAS, LOS_ANGELES));
}

#[then("the distance is between 450 and 500 kilometres")]
fn then_distance(#[from(leg)] leg: &RefCell<Option<Result<LegEstimate, EstimateError>>>) {
    let borrow = leg.borrow();
    let estimate = borrow
        .as_ref()
        .expect("estimate should have run")
        .as_ref()
        .expect("haversine never fails with defaults");
    // ~370 km great-circle scaled by the 1.3 detour factor.
    assert!(
        (450_000.0..500_000.0).contains(&estimate.distance_m),
        "got {}",
        estimate.distance_m
    );
}

#[scenario(path = "tests/features/leg_estimator.feature", index = 0)]
fn matrix_returned(estimator: UnitLegEstimator, result: RefCell<Result<LegMatrix, MatrixError>>) {
    let _ = (estimator, result);
}

#[scenario(path = "tests/features/leg_estimator.feature", index = 1)]
fn error_on_empty(estimator: UnitLegEstimator, result: RefCell<Result<LegMatrix, MatrixError>>) {
    let _ = (estimator, result);
}

#[scenario(path = "tests/features/leg_estimator.feature", index = 2)]
fn haversine_city_pair(leg: RefCell<Option<Result<LegEstimate, EstimateError>>>) {
    let _ = leg;
}
