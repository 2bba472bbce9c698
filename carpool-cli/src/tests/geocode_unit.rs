//! Unit tests for the `geocode` and `reverse` commands against scripted
//! providers.

use std::sync::Arc;
use std::time::Duration;

use crate::geocode::{
    GeocodeArgs, GeocodeConfig, GeocoderConfig, ReverseArgs, ReverseConfig, run_geocode_with,
    run_reverse_with,
};
use crate::{ARG_GEOCODE_QUERY, ARG_REVERSE_LNG, CliError, ENV_REVERSE_LNG};
use carpool_core::Coordinate;
use carpool_data::geocoding::test_support::ScriptedGeocoder;
use carpool_data::geocoding::{GeocodeError, GeocoderSlot, GeocodingService, ProviderError};
use carpool_data::{RateLimiter, RetryPolicy};
use rstest::{fixture, rstest};
use serde_json::Value;

fn service_with(providers: &[&ScriptedGeocoder]) -> GeocodingService {
    providers.iter().fold(
        GeocodingService::new(Arc::new(RateLimiter::new(Duration::ZERO))),
        |service, geocoder| {
            service.with_provider(
                GeocoderSlot::new((*geocoder).clone()).with_retry(RetryPolicy::never()),
            )
        },
    )
}

#[fixture]
fn geocode_config() -> GeocodeConfig {
    GeocodeConfig::try_from(GeocodeArgs {
        query: Some("Union Station".to_owned()),
        limit: Some(1),
        countries: Some("us, ,ca".to_owned()),
        ..GeocodeArgs::default()
    })
    .expect("config should build")
}

#[rstest]
fn geocode_config_requires_a_query() {
    let err = GeocodeConfig::try_from(GeocodeArgs::default()).expect_err("query is required");
    match err {
        CliError::MissingArgument { field, .. } => assert_eq!(field, ARG_GEOCODE_QUERY),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn geocode_config_parses_search_options(geocode_config: GeocodeConfig) {
    assert_eq!(geocode_config.options.limit, 1);
    assert_eq!(
        geocode_config.options.country_codes,
        vec!["us".to_owned(), "ca".to_owned()]
    );
    assert_eq!(geocode_config.geocoder, GeocoderConfig::new(None, None, None));
}

#[rstest]
fn geocode_prints_best_candidate_with_provenance(geocode_config: GeocodeConfig) {
    let primary = ScriptedGeocoder::new("nominatim");
    let service = service_with(&[&primary]);
    let mut stdout = Vec::new();

    run_geocode_with(&geocode_config, &service, &mut stdout).expect("lookup succeeds");

    let output: Value = serde_json::from_slice(&stdout).expect("JSON output");
    assert_eq!(output["provider"], "nominatim");
    assert_eq!(output["from_cache"], false);
    let candidates = output["value"].as_array().expect("candidate list");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["display_name"], "Union Station (best)");
}

#[rstest]
fn geocode_falls_back_to_the_secondary_provider(geocode_config: GeocodeConfig) {
    let primary = ScriptedGeocoder::new("nominatim").failing_with(ProviderError::Http {
        status: 503,
        message: "unavailable".to_owned(),
    });
    let secondary = ScriptedGeocoder::new("photon");
    let service = service_with(&[&primary, &secondary]);
    let mut stdout = Vec::new();

    run_geocode_with(&geocode_config, &service, &mut stdout).expect("fallback answers");

    let output: Value = serde_json::from_slice(&stdout).expect("JSON output");
    assert_eq!(output["provider"], "photon");
    assert_eq!(primary.calls(), 1);
}

#[rstest]
fn geocode_reports_when_nothing_matches(geocode_config: GeocodeConfig) {
    let primary = ScriptedGeocoder::new("nominatim").empty();
    let service = service_with(&[&primary]);
    let mut stdout = Vec::new();

    let err = run_geocode_with(&geocode_config, &service, &mut stdout)
        .expect_err("no candidates should fail");
    match err {
        CliError::Geocode { query, source } => {
            assert_eq!(query, "Union Station");
            assert!(matches!(source, GeocodeError::NotFound { .. }));
        }
        other => panic!("expected Geocode, found {other:?}"),
    }
    assert!(stdout.is_empty());
}

#[rstest]
fn reverse_config_requires_both_axes() {
    let err = ReverseConfig::try_from(ReverseArgs {
        lat: Some(32.7767),
        ..ReverseArgs::default()
    })
    .expect_err("longitude is required");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_REVERSE_LNG);
            assert_eq!(env, ENV_REVERSE_LNG);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn reverse_prints_the_address() {
    let config = ReverseConfig {
        location: Coordinate {
            lat: 32.7767,
            lng: -96.797,
        },
        geocoder: GeocoderConfig::new(None, None, None),
    };
    let primary = ScriptedGeocoder::new("nominatim");
    let service = service_with(&[&primary]);
    let mut stdout = Vec::new();

    run_reverse_with(&config, &service, &mut stdout).expect("reverse succeeds");

    let output: Value = serde_json::from_slice(&stdout).expect("JSON output");
    assert_eq!(output["provider"], "nominatim");
    assert!(
        output["value"]["display_name"]
            .as_str()
            .is_some_and(|name| name.starts_with("near "))
    );
}

#[rstest]
fn reverse_rejects_points_off_the_globe() {
    let config = ReverseConfig {
        location: Coordinate {
            lat: 91.0,
            lng: 0.0,
        },
        geocoder: GeocoderConfig::new(None, None, None),
    };
    let primary = ScriptedGeocoder::new("nominatim");
    let service = service_with(&[&primary]);
    let mut stdout = Vec::new();

    let err = run_reverse_with(&config, &service, &mut stdout).expect_err("invalid point");
    assert!(matches!(
        err,
        CliError::ReverseGeocode(GeocodeError::InvalidCoordinate(_))
    ));
    assert_eq!(primary.calls(), 0);
}
