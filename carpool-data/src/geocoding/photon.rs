//! Photon geocoder, used as the secondary provider.
//!
//! See: <https://github.com/komoot/photon#api>

use async_trait::async_trait;
use carpool_core::Coordinate;
use serde::Deserialize;

use super::http::{HttpBackend, HttpGeocoderConfig};
use super::{Address, GeocodeCandidate, Geocoder, ProviderError, SearchOptions};
use crate::client::BuildError;

/// The public Komoot Photon instance.
pub const PHOTON_URL: &str = "https://photon.komoot.io";

/// GeoJSON feature collection returned by `/api` and `/reverse`.
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lon, lat]`.
    coordinates: (f64, f64),
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    name: Option<String>,
    housenumber: Option<String>,
    street: Option<String>,
    city: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
    countrycode: Option<String>,
}

impl Feature {
    fn location(&self) -> Result<Coordinate, ProviderError> {
        let (lng, lat) = self.geometry.coordinates;
        Coordinate::new(lat, lng).map_err(|err| ProviderError::Parse {
            message: err.to_string(),
        })
    }

    fn in_countries(&self, codes: &[String]) -> bool {
        codes.is_empty()
            || self.properties.countrycode.as_ref().is_some_and(|code| {
                codes.iter().any(|wanted| wanted.eq_ignore_ascii_case(code))
            })
    }

    fn road(&self) -> Option<String> {
        let props = &self.properties;
        match (&props.housenumber, &props.street) {
            (Some(number), Some(street)) => Some(format!("{number} {street}")),
            (_, street) => street.clone(),
        }
    }

    /// Photon has no display name; assemble one from the parts present.
    fn label(&self) -> String {
        let props = &self.properties;
        [
            props.name.clone(),
            self.road(),
            props.city.clone(),
            props.postcode.clone(),
            props.country.clone(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }

    fn into_candidate(self) -> Result<GeocodeCandidate, ProviderError> {
        Ok(GeocodeCandidate {
            location: self.location()?,
            display_name: self.label(),
            importance: None,
        })
    }

    fn into_address(self) -> Result<Address, ProviderError> {
        let location = self.location()?;
        let display_name = self.label();
        let road = self.road();
        let props = self.properties;
        Ok(Address {
            display_name,
            location: Some(location),
            road,
            city: props.city,
            postcode: props.postcode,
            country: props.country,
        })
    }
}

/// Geocoder speaking the Photon API.
///
/// Photon ignores country filters server-side, so they are applied to the
/// returned features instead.
#[derive(Debug, Clone)]
pub struct PhotonGeocoder {
    backend: HttpBackend,
}

impl PhotonGeocoder {
    /// Create a geocoder for the configured instance.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when the HTTP client cannot be built or the
    /// base URL does not parse.
    pub fn new(config: HttpGeocoderConfig) -> Result<Self, BuildError> {
        Ok(Self {
            backend: HttpBackend::new(&config)?,
        })
    }

    fn search_params(query: &str, options: &SearchOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.to_owned()), ("limit", options.limit.to_string())];
        if let Some(near) = options.near {
            params.push(("lat", near.lat.to_string()));
            params.push(("lon", near.lng.to_string()));
        }
        if let Some(language) = &options.language {
            params.push(("lang", language.clone()));
        }
        params
    }
}

#[async_trait]
impl Geocoder for PhotonGeocoder {
    fn name(&self) -> &str {
        "photon"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let url = self.backend.url("api", &Self::search_params(query, options))?;
        let collection: FeatureCollection = self.backend.get_json(url).await?;
        collection
            .features
            .into_iter()
            .filter(|feature| feature.in_countries(&options.country_codes))
            .map(Feature::into_candidate)
            .collect()
    }

    async fn reverse(&self, location: Coordinate) -> Result<Address, ProviderError> {
        let url = self.backend.url(
            "reverse",
            &[
                ("lat", location.lat.to_string()),
                ("lon", location.lng.to_string()),
            ],
        )?;
        let collection: FeatureCollection = self.backend.get_json(url).await?;
        collection
            .features
            .into_iter()
            .next()
            .ok_or(ProviderError::NoResults)?
            .into_address()
    }
}
