//! Nominatim-compatible geocoder.
//!
//! See: <https://nominatim.org/release-docs/latest/api/Search/> and
//! <https://nominatim.org/release-docs/latest/api/Reverse/>

use async_trait::async_trait;
use carpool_core::Coordinate;
use serde::Deserialize;

use super::http::{HttpBackend, HttpGeocoderConfig, parse_degrees};
use super::{Address, GeocodeCandidate, Geocoder, ProviderError, SearchOptions};
use crate::client::BuildError;

/// The public OpenStreetMap Nominatim instance.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Place returned by `/search` and `/reverse` with `format=jsonv2`.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default)]
    address: Option<PlaceAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    postcode: Option<String>,
    country: Option<String>,
}

/// `/reverse` answers either a place or `{"error": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReverseResponse {
    Miss { error: String },
    Hit(Place),
}

impl Place {
    fn location(&self) -> Result<Coordinate, ProviderError> {
        let lat = parse_degrees(&self.lat, "lat")?;
        let lng = parse_degrees(&self.lon, "lon")?;
        Coordinate::new(lat, lng).map_err(|err| ProviderError::Parse {
            message: err.to_string(),
        })
    }

    fn into_candidate(self) -> Result<GeocodeCandidate, ProviderError> {
        Ok(GeocodeCandidate {
            location: self.location()?,
            display_name: self.display_name,
            importance: self.importance,
        })
    }

    fn into_address(self) -> Result<Address, ProviderError> {
        let location = self.location()?;
        let parts = self.address.unwrap_or_default();
        let road = match (parts.house_number, parts.road) {
            (Some(number), Some(road)) => Some(format!("{number} {road}")),
            (_, road) => road,
        };
        Ok(Address {
            display_name: self.display_name,
            location: Some(location),
            road,
            city: parts.city.or(parts.town).or(parts.village),
            postcode: parts.postcode,
            country: parts.country,
        })
    }
}

/// Geocoder speaking the Nominatim search and reverse APIs.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    backend: HttpBackend,
}

impl NominatimGeocoder {
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
        let mut params = vec![
            ("q", query.to_owned()),
            ("format", "jsonv2".to_owned()),
            ("limit", options.limit.to_string()),
            ("addressdetails", "1".to_owned()),
        ];
        if !options.country_codes.is_empty() {
            params.push(("countrycodes", options.country_codes.join(",")));
        }
        if let Some(language) = &options.language {
            params.push(("accept-language", language.clone()));
        }
        params
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let url = self
            .backend
            .url("search", &Self::search_params(query, options))?;
        let places: Vec<Place> = self.backend.get_json(url).await?;
        places.into_iter().map(Place::into_candidate).collect()
    }

    async fn reverse(&self, location: Coordinate) -> Result<Address, ProviderError> {
        let url = self.backend.url(
            "reverse",
            &[
                ("lat", location.lat.to_string()),
                ("lon", location.lng.to_string()),
                ("format", "jsonv2".to_owned()),
                ("addressdetails", "1".to_owned()),
            ],
        )?;
        match self.backend.get_json(url).await? {
            ReverseResponse::Hit(place) => place.into_address(),
            ReverseResponse::Miss { error } => {
                log::debug!("nominatim has no address for {location}: {error}");
                Err(ProviderError::NoResults)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SEARCH_BODY: &str = r#"[
        {
            "place_id": 1,
            "lat": "32.7767",
            "lon": "-96.7970",
            "display_name": "Dallas, Dallas County, Texas, United States",
            "importance": 0.81,
            "address": { "city": "Dallas", "country": "United States" }
        },
        {
            "place_id": 2,
            "lat": "32.7803",
            "lon": "-96.8060",
            "display_name": "Union Station, Dallas"
        }
    ]"#;

    #[rstest]
    fn search_places_become_candidates() {
        let places: Vec<Place> = serde_json::from_str(SEARCH_BODY).expect("should deserialise");

        let candidates: Vec<_> = places
            .into_iter()
            .map(Place::into_candidate)
            .collect::<Result<_, _>>()
            .expect("coordinates are valid");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].location, Coordinate { lat: 32.7767, lng: -96.7970 });
        assert_eq!(candidates[0].importance, Some(0.81));
        assert_eq!(candidates[1].importance, None);
    }

    #[rstest]
    fn reverse_hit_becomes_address() {
        let body = r#"{
            "lat": "32.7767", "lon": "-96.7970",
            "display_name": "1500 Marilla St, Dallas",
            "address": { "house_number": "1500", "road": "Marilla St", "town": "Dallas", "postcode": "75201" }
        }"#;
        let response: ReverseResponse = serde_json::from_str(body).expect("should deserialise");
        let ReverseResponse::Hit(place) = response else {
            panic!("expected a hit");
        };

        let address = place.into_address().expect("valid address");

        assert_eq!(address.road.as_deref(), Some("1500 Marilla St"));
        assert_eq!(address.city.as_deref(), Some("Dallas"));
        assert_eq!(address.postcode.as_deref(), Some("75201"));
    }

    #[rstest]
    fn reverse_miss_is_recognised() {
        let response: ReverseResponse =
            serde_json::from_str(r#"{ "error": "Unable to geocode" }"#).expect("should deserialise");
        assert!(matches!(response, ReverseResponse::Miss { .. }));
    }

    #[rstest]
    fn out_of_range_coordinates_are_parse_errors() {
        let place = Place {
            lat: "123.0".to_owned(),
            lon: "0.0".to_owned(),
            display_name: "nowhere".to_owned(),
            importance: None,
            address: None,
        };
        assert!(matches!(
            place.into_candidate(),
            Err(ProviderError::Parse { .. })
        ));
    }

    #[rstest]
    fn search_params_include_options() {
        let options = SearchOptions::default()
            .with_limit(3)
            .with_country_codes(["us", "ca"])
            .with_language("en");

        let params = NominatimGeocoder::search_params("dallas", &options);

        assert!(params.contains(&("limit", "3".to_owned())));
        assert!(params.contains(&("countrycodes", "us,ca".to_owned())));
        assert!(params.contains(&("accept-language", "en".to_owned())));
    }
}
