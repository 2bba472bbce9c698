//! Test helpers for writing route requests and stubbing route collaborators.

use camino::{Utf8Path, Utf8PathBuf};
use carpool_core::test_support::UnitLegEstimator;
use carpool_core::{Coordinate, Sequencer};
use carpool_solver::WaypointSequencer;
use serde_json::json;
use std::cell::RefCell;
use tempfile::TempDir;

use crate::CliError;
use crate::route::{RouteBackend, RouteConfig};

/// Write `contents` to `path`, creating the file.
pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write file");
}

/// A temporary directory addressed by a UTF-8 path.
pub(super) fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

pub(super) const DOWNTOWN: Coordinate = Coordinate {
    lat: 32.7767,
    lng: -96.7970,
};

pub(super) const GEOCODED: Coordinate = Coordinate {
    lat: 32.7841,
    lng: -96.7838,
};

/// A driver, two passengers (one given as a query) and a destination.
pub(super) fn route_request_json() -> serde_json::Value {
    json!({
        "origin": { "name": "Driver", "location": { "lat": 32.7767, "lng": -96.7970 } },
        "pickups": [
            { "name": "Ana", "query": "Deep Ellum, Dallas" },
            { "name": "Bo", "location": { "lat": 32.8029, "lng": -96.8285 } }
        ],
        "destination": { "name": "Office", "location": { "lat": 32.8998, "lng": -97.0403 } }
    })
}

/// Resolves every query to [`GEOCODED`] and sequences over unit legs.
#[derive(Debug, Default)]
pub(super) struct StubBackend {
    pub(super) queries: RefCell<Vec<String>>,
    pub(super) unknown: Option<String>,
}

impl StubBackend {
    pub(super) fn failing_on(query: &str) -> Self {
        Self {
            unknown: Some(query.to_owned()),
            ..Self::default()
        }
    }
}

impl RouteBackend for StubBackend {
    fn resolve(&self, query: &str) -> Result<Coordinate, CliError> {
        self.queries.borrow_mut().push(query.to_owned());
        if self.unknown.as_deref() == Some(query) {
            return Err(CliError::Geocode {
                query: query.to_owned(),
                source: carpool_data::geocoding::GeocodeError::NotFound {
                    query: query.to_owned(),
                },
            });
        }
        Ok(GEOCODED)
    }

    fn sequencer(&self, config: &RouteConfig) -> Result<Box<dyn Sequencer>, CliError> {
        Ok(Box::new(WaypointSequencer::with_config(
            UnitLegEstimator,
            config.sequencer,
        )))
    }
}
