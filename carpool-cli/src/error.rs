//! Error types emitted by the carpool CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use carpool_core::{InvalidInputError, SequenceError, StoreError};
use carpool_data::BuildError;
use carpool_data::geocoding::GeocodeError;
use thiserror::Error;

/// Errors emitted by the carpool CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The requested operation requires a missing compile-time feature.
    #[error("{action} requires the `{feature}` feature to be enabled")]
    MissingFeature {
        feature: &'static str,
        action: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the route request file failed.
    #[error("failed to open route request at {path:?}: {source}")]
    OpenRouteRequest {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Route request JSON could not be decoded.
    #[error("failed to parse route request JSON at {path:?}: {source}")]
    ParseRouteRequest {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The route request failed validation.
    #[error("route request in {path:?} failed validation: {source}")]
    InvalidRouteRequest {
        path: Utf8PathBuf,
        #[source]
        source: InvalidInputError,
    },
    /// A place query could not be geocoded.
    #[error("failed to geocode {query:?}: {source}")]
    Geocode {
        query: String,
        #[source]
        source: GeocodeError,
    },
    /// Reverse geocoding failed.
    #[error("failed to reverse geocode: {0}")]
    ReverseGeocode(#[source] GeocodeError),
    /// Constructing an HTTP client for a provider failed.
    #[error("failed to build client for {base_url:?}: {source}")]
    BuildClient {
        base_url: String,
        #[source]
        source: BuildError,
    },
    /// Building the async runtime failed.
    #[error("failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The sequencer rejected the request.
    #[error("routing failed: {source}")]
    Sequence {
        #[source]
        source: SequenceError,
    },
    /// Preparing the store directory failed.
    #[error("failed to create directory for {path:?}: {source}")]
    CreateStoreDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Reading or writing the document store failed.
    #[error("document store {path:?} failed: {source}")]
    Store {
        path: Utf8PathBuf,
        #[source]
        source: StoreError,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// Installing the log subscriber failed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[source] tracing_subscriber::util::TryInitError),
}
