//! `geocode` and `reverse` command implementations.

use std::io::Write;
use std::sync::Arc;

use carpool_core::Coordinate;
use carpool_data::RateLimiter;
use carpool_data::geocoding::{
    GeocoderSlot, GeocodingService, HttpGeocoderConfig, NOMINATIM_URL, NominatimGeocoder,
    PHOTON_URL, PhotonGeocoder, SearchOptions,
};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_GEOCODE_QUERY, ARG_REVERSE_LAT, ARG_REVERSE_LNG, CliError, ENV_GEOCODE_QUERY,
    ENV_REVERSE_LAT, ENV_REVERSE_LNG, write_json,
};

/// Provider endpoints shared by every command that geocodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeocoderConfig {
    pub(crate) nominatim_url: String,
    pub(crate) photon_url: String,
    pub(crate) api_key: Option<String>,
}

impl GeocoderConfig {
    pub(crate) fn new(
        nominatim_url: Option<String>,
        photon_url: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            nominatim_url: nominatim_url.unwrap_or_else(|| NOMINATIM_URL.to_owned()),
            photon_url: photon_url.unwrap_or_else(|| PHOTON_URL.to_owned()),
            api_key,
        }
    }

    fn http_config(&self, base_url: &str) -> HttpGeocoderConfig {
        let config = HttpGeocoderConfig::new(base_url);
        match &self.api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }

    /// Nominatim first, Photon as the fallback, both behind `limiter`.
    pub(crate) fn build_service(
        &self,
        limiter: Arc<RateLimiter>,
    ) -> Result<GeocodingService, CliError> {
        let nominatim = NominatimGeocoder::new(self.http_config(&self.nominatim_url)).map_err(
            |source| CliError::BuildClient {
                base_url: self.nominatim_url.clone(),
                source,
            },
        )?;
        let photon = PhotonGeocoder::new(self.http_config(&self.photon_url)).map_err(|source| {
            CliError::BuildClient {
                base_url: self.photon_url.clone(),
                source,
            }
        })?;
        Ok(GeocodingService::new(limiter)
            .with_provider(GeocoderSlot::new(nominatim))
            .with_provider(GeocoderSlot::new(photon)))
    }
}

/// CLI arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Look up a place name and print ranked candidates as JSON. \
                 Each answer records which provider produced it and whether \
                 it came from cache.",
    about = "Resolve a place name to coordinates"
)]
#[ortho_config(prefix = "CARPOOL")]
pub(crate) struct GeocodeArgs {
    /// Free-form place query, e.g. "Union Station, Dallas".
    #[arg(value_name = "query")]
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Maximum number of candidates to print.
    #[arg(long, value_name = "n")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
    /// Comma-separated ISO country codes restricting results.
    #[arg(long, value_name = "codes")]
    #[serde(default)]
    pub(crate) countries: Option<String>,
    /// Preferred response language.
    #[arg(long, value_name = "lang")]
    #[serde(default)]
    pub(crate) language: Option<String>,
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

impl GeocodeArgs {
    pub(crate) fn into_config(self) -> Result<GeocodeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        GeocodeConfig::try_from(merged)
    }
}

/// Resolved `geocode` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GeocodeConfig {
    pub(crate) query: String,
    pub(crate) options: SearchOptions,
    pub(crate) geocoder: GeocoderConfig,
}

impl TryFrom<GeocodeArgs> for GeocodeConfig {
    type Error = CliError;

    fn try_from(args: GeocodeArgs) -> Result<Self, Self::Error> {
        let query = args.query.ok_or(CliError::MissingArgument {
            field: ARG_GEOCODE_QUERY,
            env: ENV_GEOCODE_QUERY,
        })?;
        let mut options = SearchOptions::default();
        if let Some(limit) = args.limit {
            options = options.with_limit(limit);
        }
        if let Some(countries) = args.countries {
            options = options.with_country_codes(
                countries
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty()),
            );
        }
        if let Some(language) = args.language {
            options = options.with_language(language);
        }
        Ok(Self {
            query,
            options,
            geocoder: GeocoderConfig::new(args.nominatim_url, args.photon_url, args.api_key),
        })
    }
}

/// CLI arguments for the `reverse` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Describe the address at a coordinate")]
#[ortho_config(prefix = "CARPOOL")]
pub(crate) struct ReverseArgs {
    /// Latitude in degrees.
    #[arg(long = ARG_REVERSE_LAT, value_name = "deg", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude in degrees.
    #[arg(long = ARG_REVERSE_LNG, value_name = "deg", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) lng: Option<f64>,
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

impl ReverseArgs {
    pub(crate) fn into_config(self) -> Result<ReverseConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ReverseConfig::try_from(merged)
    }
}

/// Resolved `reverse` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReverseConfig {
    pub(crate) location: Coordinate,
    pub(crate) geocoder: GeocoderConfig,
}

impl TryFrom<ReverseArgs> for ReverseConfig {
    type Error = CliError;

    fn try_from(args: ReverseArgs) -> Result<Self, Self::Error> {
        let lat = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_REVERSE_LAT,
            env: ENV_REVERSE_LAT,
        })?;
        let lng = args.lng.ok_or(CliError::MissingArgument {
            field: ARG_REVERSE_LNG,
            env: ENV_REVERSE_LNG,
        })?;
        Ok(Self {
            location: Coordinate { lat, lng },
            geocoder: GeocoderConfig::new(args.nominatim_url, args.photon_url, args.api_key),
        })
    }
}

pub(crate) fn run_geocode(args: GeocodeArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let service = config
        .geocoder
        .build_service(Arc::new(RateLimiter::default()))?;
    let mut stdout = std::io::stdout().lock();
    run_geocode_with(&config, &service, &mut stdout)
}

pub(crate) fn run_geocode_with(
    config: &GeocodeConfig,
    service: &GeocodingService,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let runtime = crate::runtime()?;
    let resolved = runtime
        .block_on(service.search(&config.query, &config.options))
        .map_err(|source| CliError::Geocode {
            query: config.query.clone(),
            source,
        })?;
    log::info!(
        "{} candidate(s) for {:?} from {}",
        resolved.value.len(),
        config.query,
        resolved.provider
    );
    write_json(writer, &resolved)
}

pub(crate) fn run_reverse(args: ReverseArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let service = config
        .geocoder
        .build_service(Arc::new(RateLimiter::default()))?;
    let mut stdout = std::io::stdout().lock();
    run_reverse_with(&config, &service, &mut stdout)
}

pub(crate) fn run_reverse_with(
    config: &ReverseConfig,
    service: &GeocodingService,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let runtime = crate::runtime()?;
    let resolved = runtime
        .block_on(service.reverse(config.location))
        .map_err(CliError::ReverseGeocode)?;
    write_json(writer, &resolved)
}
