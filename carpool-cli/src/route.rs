//! Route command implementation for the carpool CLI.

use std::io::{BufReader, Write};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use carpool_core::{
    Coordinate, HaversineEstimator, RouteConstraints, SequenceRequest, SequenceResponse,
    Sequencer, Waypoint, WaypointKind,
};
use carpool_data::RateLimiter;
use carpool_data::geocoding::{GeocodingService, SearchOptions};
use carpool_data::routing::{FallbackEstimator, HttpLegEstimator};
use carpool_solver::{SequencerConfig, WaypointSequencer};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

use crate::fs::{file_is_file, open_utf8_file};
use crate::geocode::GeocoderConfig;
use crate::{ARG_ROUTE_REQUEST, CliError, ENV_ROUTE_REQUEST, write_json};

/// Collection computed routes are persisted under.
pub(crate) const ROUTES_COLLECTION: &str = "routes";

/// Document id used when `--route-id` is not given.
pub(crate) const DEFAULT_ROUTE_ID: &str = "latest";

/// CLI arguments for the `route` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Order pickups between a driver's origin and a shared \
                 destination. Places in the request may give coordinates \
                 or a query to geocode. Legs come from OSRM when a base URL \
                 is configured, falling back to great-circle estimates.",
    about = "Compute a shared route"
)]
#[ortho_config(prefix = "CARPOOL")]
pub(crate) struct RouteArgs {
    /// Path to a JSON file describing origin, pickups and destination.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) request_path: Option<Utf8PathBuf>,
    /// Base URL for an OSRM server (e.g. "http://localhost:5000").
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) osrm_base_url: Option<String>,
    /// SQLite document store to persist the computed route into.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) store_db: Option<Utf8PathBuf>,
    /// Document id for the persisted route.
    #[arg(long, value_name = "id")]
    #[serde(default)]
    pub(crate) route_id: Option<String>,
    /// Largest pickup count solved by exhaustive search.
    #[arg(long, value_name = "n")]
    #[serde(default)]
    pub(crate) exhaustive_limit: Option<usize>,
    /// Base URL of the primary (Nominatim-compatible) geocoder.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) nominatim_url: Option<String>,
    /// Base URL of the fallback (Photon) geocoder.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) photon_url: Option<String>,
    /// API key sent to both geocoders.
    #[arg(long, value_name = "key")]
    #[serde(default)]
    pub(crate) api_key: Option<String>,
}

impl RouteArgs {
    pub(crate) fn into_config(self) -> Result<RouteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RouteConfig::try_from(merged)
    }
}

/// Resolved `route` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RouteConfig {
    pub(crate) request_path: Utf8PathBuf,
    pub(crate) osrm_base_url: Option<String>,
    pub(crate) store_db: Option<Utf8PathBuf>,
    pub(crate) route_id: String,
    pub(crate) sequencer: SequencerConfig,
    pub(crate) geocoder: GeocoderConfig,
}

impl RouteConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        let path = &self.request_path;
        match file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field: ARG_ROUTE_REQUEST,
                path: path.clone(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field: ARG_ROUTE_REQUEST,
                    path: path.clone(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field: ARG_ROUTE_REQUEST,
                path: path.clone(),
                source,
            }),
        }
    }
}

impl TryFrom<RouteArgs> for RouteConfig {
    type Error = CliError;

    fn try_from(args: RouteArgs) -> Result<Self, Self::Error> {
        let request_path = args.request_path.ok_or(CliError::MissingArgument {
            field: ARG_ROUTE_REQUEST,
            env: ENV_ROUTE_REQUEST,
        })?;
        let mut sequencer = SequencerConfig::default();
        if let Some(limit) = args.exhaustive_limit {
            sequencer = sequencer.with_exhaustive_limit(limit);
        }
        Ok(Self {
            request_path,
            osrm_base_url: args.osrm_base_url,
            store_db: args.store_db,
            route_id: args
                .route_id
                .unwrap_or_else(|| DEFAULT_ROUTE_ID.to_owned()),
            sequencer,
            geocoder: GeocoderConfig::new(args.nominatim_url, args.photon_url, args.api_key),
        })
    }
}

/// A place in a route request file: either coordinates or a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Place {
    /// Explicit coordinates.
    At { location: Coordinate },
    /// Text to geocode.
    Query { query: String },
}

/// A named place in a route request file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlaceSpec {
    pub(crate) name: String,
    #[serde(flatten)]
    pub(crate) place: Place,
}

/// On-disk route request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RouteRequestFile {
    pub(crate) origin: PlaceSpec,
    #[serde(default)]
    pub(crate) pickups: Vec<PlaceSpec>,
    pub(crate) destination: PlaceSpec,
    #[serde(default)]
    pub(crate) constraints: RouteConstraints,
}

/// Collaborators the route command needs.
pub(crate) trait RouteBackend {
    /// Resolve a place query to coordinates.
    fn resolve(&self, query: &str) -> Result<Coordinate, CliError>;
    /// Build the sequencer for this invocation.
    fn sequencer(&self, config: &RouteConfig) -> Result<Box<dyn Sequencer>, CliError>;
}

/// Geocodes through Nominatim/Photon and estimates legs through OSRM when
/// configured; one rate limiter covers both.
pub(crate) struct DefaultRouteBackend {
    limiter: Arc<RateLimiter>,
    geocoding: GeocodingService,
    runtime: Runtime,
}

impl DefaultRouteBackend {
    pub(crate) fn new(config: &RouteConfig) -> Result<Self, CliError> {
        let limiter = Arc::new(RateLimiter::default());
        let geocoding = config.geocoder.build_service(Arc::clone(&limiter))?;
        Ok(Self {
            limiter,
            geocoding,
            runtime: crate::runtime()?,
        })
    }
}

impl RouteBackend for DefaultRouteBackend {
    fn resolve(&self, query: &str) -> Result<Coordinate, CliError> {
        let resolved = self
            .runtime
            .block_on(self.geocoding.resolve(query, &SearchOptions::default()))
            .map_err(|source| CliError::Geocode {
                query: query.to_owned(),
                source,
            })?;
        log::info!(
            "resolved {query:?} to {} via {}",
            resolved.value.display_name,
            resolved.provider
        );
        Ok(resolved.value.location)
    }

    fn sequencer(&self, config: &RouteConfig) -> Result<Box<dyn Sequencer>, CliError> {
        let Some(base_url) = &config.osrm_base_url else {
            return Ok(Box::new(WaypointSequencer::with_config(
                HaversineEstimator::default(),
                config.sequencer,
            )));
        };
        let primary = HttpLegEstimator::new(base_url.clone())
            .map_err(|source| CliError::BuildClient {
                base_url: base_url.clone(),
                source,
            })?
            .with_rate_limiter(Arc::clone(&self.limiter));
        let estimator = FallbackEstimator::new(primary, HaversineEstimator::default());
        Ok(Box::new(WaypointSequencer::with_config(
            estimator,
            config.sequencer,
        )))
    }
}

pub(crate) fn run_route(args: RouteArgs) -> Result<(), CliError> {
    let config = resolve_route_config(args)?;
    let backend = DefaultRouteBackend::new(&config)?;
    let mut stdout = std::io::stdout().lock();
    let response = execute_route(&config, &backend)?;
    write_json(&mut stdout, &response)
}

pub(crate) fn run_route_with(
    args: RouteArgs,
    backend: &dyn RouteBackend,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = resolve_route_config(args)?;
    let response = execute_route(&config, backend)?;
    write_json(writer, &response)
}

fn resolve_route_config(args: RouteArgs) -> Result<RouteConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn execute_route(
    config: &RouteConfig,
    backend: &dyn RouteBackend,
) -> Result<SequenceResponse, CliError> {
    let file = load_route_request(&config.request_path)?;
    let request = build_request(file, backend)?;
    request
        .validate()
        .map_err(|source| CliError::InvalidRouteRequest {
            path: config.request_path.clone(),
            source,
        })?;
    let sequencer = backend.sequencer(config)?;
    let response = sequencer
        .sequence(&request)
        .map_err(|source| CliError::Sequence { source })?;
    log::info!(
        "sequenced {} pickup(s) with {:?} in {:?}",
        request.pickups.len(),
        response.diagnostics.strategy,
        response.diagnostics.solve_time
    );
    if let Some(path) = &config.store_db {
        persist_route(path, &config.route_id, &response)?;
    }
    Ok(response)
}

/// Loads a JSON-encoded [`RouteRequestFile`] from disk.
pub(crate) fn load_route_request(path: &Utf8Path) -> Result<RouteRequestFile, CliError> {
    let file = open_utf8_file(path).map_err(|source| CliError::OpenRouteRequest {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CliError::ParseRouteRequest {
        path: path.to_path_buf(),
        source,
    })
}

/// Turn a request file into a sequencing request, geocoding queries in
/// file order.
pub(crate) fn build_request(
    file: RouteRequestFile,
    backend: &dyn RouteBackend,
) -> Result<SequenceRequest, CliError> {
    let to_waypoint = |kind: WaypointKind, spec: PlaceSpec| -> Result<Waypoint, CliError> {
        let location = match spec.place {
            Place::At { location } => location,
            Place::Query { query } => backend.resolve(&query)?,
        };
        Ok(Waypoint::new(kind, spec.name, location))
    };
    let origin = to_waypoint(WaypointKind::Origin, file.origin)?;
    let pickups = file
        .pickups
        .into_iter()
        .map(|spec| to_waypoint(WaypointKind::Pickup, spec))
        .collect::<Result<Vec<_>, _>>()?;
    let destination = to_waypoint(WaypointKind::Destination, file.destination)?;
    Ok(SequenceRequest::new(origin, pickups, destination).with_constraints(file.constraints))
}

#[cfg(feature = "store-sqlite")]
fn persist_route(
    path: &Utf8Path,
    route_id: &str,
    response: &SequenceResponse,
) -> Result<(), CliError> {
    use carpool_core::{DocumentStoreExt, SqliteDocumentStore};

    crate::fs::ensure_parent_dir(path).map_err(|source| CliError::CreateStoreDir {
        path: path.to_path_buf(),
        source,
    })?;
    let store_error = |source| CliError::Store {
        path: path.to_path_buf(),
        source,
    };
    let store = SqliteDocumentStore::open(path.as_std_path()).map_err(store_error)?;
    store
        .put(ROUTES_COLLECTION, route_id, response)
        .map_err(store_error)?;
    log::info!("stored route {route_id:?} in {path}");
    Ok(())
}

#[cfg(not(feature = "store-sqlite"))]
fn persist_route(
    _path: &Utf8Path,
    _route_id: &str,
    _response: &SequenceResponse,
) -> Result<(), CliError> {
    Err(CliError::MissingFeature {
        feature: "store-sqlite",
        action: "persisting routes",
    })
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<RouteConfig, CliError> {
    let merged = RouteArgs::merge_from_layers(layers).map_err(CliError::from)?;
    RouteConfig::try_from(merged)
}
