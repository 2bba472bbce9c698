//! Behaviour-driven step definitions driving the route CLI scenarios.

use super::helpers::{StubBackend, route_request_json, utf8_tempdir, write_utf8};
use super::*;
use camino::Utf8PathBuf;
use carpool_core::{InvalidInputError, SequenceResponse};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

struct RouteWorld {
    _tmp: TempDir,
    root: Utf8PathBuf,
    request_path: Utf8PathBuf,
    include_request: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl RouteWorld {
    fn new() -> Self {
        let (tmp, root) = utf8_tempdir();
        let request_path = root.join("request.json");
        Self {
            _tmp: tmp,
            root,
            request_path,
            include_request: RefCell::new(true),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn store_db(&self) -> Utf8PathBuf {
        self.root.join("routes.db")
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["carpool".to_owned(), "route".to_owned()];
        if *self.include_request.borrow() {
            argv.push(self.request_path.as_str().to_owned());
        }
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> RouteWorld {
    RouteWorld::new()
}

#[given("a route request with a geocoded pickup exists on disk")]
fn valid_route_request_exists(#[from(world)] world: &RouteWorld) {
    write_utf8(
        &world.request_path,
        route_request_json().to_string().as_bytes(),
    );
}

#[given("I ask to store the route as {id}")]
fn store_route_as(#[from(world)] world: &RouteWorld, id: String) {
    let id = id.trim_matches('"').to_owned();
    world.cli_args.borrow_mut().extend([
        "--store-db".to_owned(),
        world.store_db().as_str().to_owned(),
        "--route-id".to_owned(),
        id,
    ]);
}

#[given("the route request contains invalid JSON")]
fn route_request_contains_invalid_json(#[from(world)] world: &RouteWorld) {
    write_utf8(&world.request_path, b"{ not valid json");
}

#[given("the route request has an origin latitude of {lat}")]
fn route_request_has_origin_latitude(#[from(world)] world: &RouteWorld, lat: f64) {
    let mut payload = route_request_json();
    payload["origin"]["location"]["lat"] = serde_json::json!(lat);
    write_utf8(&world.request_path, payload.to_string().as_bytes());
}

#[given("I omit the route request path")]
fn omit_route_request_path(#[from(world)] world: &RouteWorld) {
    *world.include_request.borrow_mut() = false;
}

#[when("I run the route command")]
fn run_route_command(#[from(world)] world: &RouteWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Route(args) => {
            let backend = StubBackend::default();
            let mut buffer = world.stdout.borrow_mut();
            route::run_route_with(args, &backend, &mut *buffer)
        }
        other => panic!("expected route command, found {other:?}"),
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds and prints every pickup once")]
fn command_succeeds_and_prints_route(#[from(world)] world: &RouteWorld) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    result.as_ref().expect("expected success");

    let stdout = String::from_utf8(world.stdout.borrow().clone()).expect("stdout utf-8");
    let response: SequenceResponse =
        serde_json::from_str(&stdout).expect("output should be a JSON route response");
    let mut names: Vec<_> = response
        .route
        .pickups()
        .map(|waypoint| waypoint.name.clone())
        .collect();
    names.sort();
    assert_eq!(names, ["Ana", "Bo"]);
}

#[then("the store holds the route under {id}")]
fn store_holds_route(#[from(world)] world: &RouteWorld, id: String) {
    use carpool_core::{DocumentStoreExt, SqliteDocumentStore};

    let id = id.trim_matches('"');
    let store = SqliteDocumentStore::open(world.store_db().as_std_path()).expect("store opens");
    let stored: Option<SequenceResponse> = store
        .fetch(route::ROUTES_COLLECTION, id)
        .expect("document decodes");
    let stored = stored.expect("route was stored");
    assert_eq!(stored.route.pickups().count(), 2);
}

#[then("the command fails because the request JSON is invalid")]
fn command_fails_invalid_json(#[from(world)] world: &RouteWorld) {
    match &*world.error() {
        CliError::ParseRouteRequest { .. } => {}
        other => panic!("expected ParseRouteRequest, found {other:?}"),
    }
}

#[then("the command fails because the request is invalid")]
fn command_fails_invalid_request(#[from(world)] world: &RouteWorld) {
    match &*world.error() {
        CliError::InvalidRouteRequest { source, .. } => {
            assert!(matches!(
                source,
                InvalidInputError::InvalidCoordinate { .. }
            ));
        }
        other => panic!("expected InvalidRouteRequest, found {other:?}"),
    }
}

#[then("the command fails because the request path is missing")]
fn command_fails_missing_request_path(#[from(world)] world: &RouteWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_ROUTE_REQUEST),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_route_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/route_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: RouteWorld) {
            let _ = world;
        }
    };
}

register_route_scenario!(route_happy_path, "routing a request from JSON");
register_route_scenario!(route_persists, "persisting the computed route");
register_route_scenario!(route_invalid_json, "rejecting invalid JSON input");
register_route_scenario!(route_invalid_request, "rejecting out-of-range coordinates");
register_route_scenario!(route_missing_request, "rejecting missing request paths");
