#![expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]

//! Behavioural tests for golden routes using rstest-bdd.
//!
//! These scenarios exercise the sequencer with well-defined requests loaded
//! from JSON files, verifying consistent behaviour across code changes.

mod golden_routes_support;

use std::cell::RefCell;

use carpool_core::{SequenceError, SequenceResponse, Sequencer};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use golden_routes_support::{
    GoldenRoute, build_sequencer, expected_duration, load_golden_route, visiting_order,
};

#[derive(Default)]
struct GoldenWorld {
    golden: Option<GoldenRoute>,
    outcome: Option<Result<SequenceResponse, SequenceError>>,
}

impl GoldenWorld {
    fn golden(&self) -> &GoldenRoute {
        self.golden.as_ref().expect("golden route must be loaded")
    }

    fn response(&self) -> &SequenceResponse {
        self.outcome
            .as_ref()
            .expect("golden route must be sequenced")
            .as_ref()
            .expect("golden route should sequence successfully")
    }
}

#[fixture]
fn world() -> RefCell<GoldenWorld> {
    RefCell::new(GoldenWorld::default())
}

#[given("the golden route {name}")]
fn given_golden(#[from(world)] world: &RefCell<GoldenWorld>, name: String) {
    world.borrow_mut().golden = Some(load_golden_route(name.trim_matches('"')));
}

#[when("I sequence the golden route")]
fn when_sequenced(#[from(world)] world: &RefCell<GoldenWorld>) {
    let result = {
        let guard = world.borrow();
        let golden = guard.golden();
        build_sequencer(golden).sequence(&golden.request)
    };
    world.borrow_mut().outcome = Some(result);
}

#[then("the pickups are visited in the expected order")]
fn then_order(#[from(world)] world: &RefCell<GoldenWorld>) {
    let guard = world.borrow();
    assert_eq!(visiting_order(guard.response()), guard.golden().expected.order);
}

#[then("the total duration matches the expected value")]
fn then_duration(#[from(world)] world: &RefCell<GoldenWorld>) {
    let guard = world.borrow();
    assert_eq!(
        guard.response().route.total_duration(),
        expected_duration(&guard.golden().expected)
    );
}

#[then("the search used is the expected strategy")]
fn then_strategy(#[from(world)] world: &RefCell<GoldenWorld>) {
    let guard = world.borrow();
    assert_eq!(
        guard.response().diagnostics.strategy,
        guard.golden().expected.strategy
    );
}

#[scenario(path = "tests/features/golden_routes.feature", index = 0)]
fn crossing_pickups(world: RefCell<GoldenWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/golden_routes.feature", index = 1)]
fn scattered_line(world: RefCell<GoldenWorld>) {
    let _ = world;
}
