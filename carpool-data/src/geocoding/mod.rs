//! Place-name and reverse geocoding through a chain of HTTP providers.
//!
//! [`GeocodingService`] is the entry point. It owns an ordered list of
//! [`GeocoderSlot`]s, a TTL cache and a shared [`crate::RateLimiter`]:
//!
//! 1. Queries are normalised and looked up in the cache; a hit makes no
//!    outbound call.
//! 2. Otherwise each provider is tried in order. Transient failures are
//!    retried per the slot's [`crate::RetryPolicy`]; permanent failures
//!    move on to the next provider at once.
//! 3. The first provider to answer wins. Its answer is ranked, tagged with
//!    the provider name and attempt count, and cached.
//!
//! [`GeocodeError`] is returned only once every provider is exhausted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use carpool_data::RateLimiter;
//! use carpool_data::geocoding::{
//!     GeocoderSlot, GeocodingService, HttpGeocoderConfig, NominatimGeocoder, PhotonGeocoder,
//!     SearchOptions,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let service = GeocodingService::new(Arc::new(RateLimiter::default()))
//!     .with_provider(GeocoderSlot::new(NominatimGeocoder::new(
//!         HttpGeocoderConfig::new(carpool_data::geocoding::NOMINATIM_URL),
//!     )?))
//!     .with_provider(GeocoderSlot::new(PhotonGeocoder::new(
//!         HttpGeocoderConfig::new(carpool_data::geocoding::PHOTON_URL),
//!     )?));
//!
//! let top = service.resolve("Union Station, Dallas", &SearchOptions::default()).await?;
//! println!("{} via {}", top.value.location, top.provider);
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;

use async_trait::async_trait;
use carpool_core::{Coordinate, HaversineEstimator};
use serde::{Deserialize, Serialize};

mod cache;
mod error;
mod http;
mod nominatim;
mod photon;
mod service;

#[doc(hidden)]
pub mod test_support;

pub use cache::{GeocodeCache, GeocodeCacheConfig};
pub use error::{GeocodeError, ProviderError, ProviderFailure};
pub use http::{DEFAULT_USER_AGENT, HttpGeocoderConfig};
pub use nominatim::{NOMINATIM_URL, NominatimGeocoder};
pub use photon::{PHOTON_URL, PhotonGeocoder};
pub use service::{GeocoderSlot, GeocodingService};

/// Candidates returned by [`SearchOptions::default`].
const DEFAULT_LIMIT: usize = 5;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    /// Resolved position.
    pub location: Coordinate,
    /// Human-readable label.
    pub display_name: String,
    /// Provider-assigned relevance in `[0, 1]`, when the provider has one.
    pub importance: Option<f64>,
}

/// A structured address for a coordinate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Address {
    /// Full label.
    pub display_name: String,
    /// Position the provider snapped to, if reported.
    pub location: Option<Coordinate>,
    /// Street name, with house number when known.
    pub road: Option<String>,
    /// City, town or village.
    pub city: Option<String>,
    /// Postal code.
    pub postcode: Option<String>,
    /// Country name.
    pub country: Option<String>,
}

/// Knobs for [`GeocodingService::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum candidates returned.
    pub limit: usize,
    /// Bias point; closer candidates rank higher among equals.
    pub near: Option<Coordinate>,
    /// ISO 3166-1 alpha-2 codes restricting results.
    pub country_codes: Vec<String>,
    /// Preferred response language, e.g. `"en"`.
    pub language: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            near: None,
            country_codes: Vec::new(),
            language: None,
        }
    }
}

impl SearchOptions {
    /// Set the candidate limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Bias ranking towards `point`.
    #[must_use]
    pub const fn near(mut self, point: Coordinate) -> Self {
        self.near = Some(point);
        self
    }

    /// Restrict results to the given countries.
    #[must_use]
    pub fn with_country_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the preferred language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// A lookup answer tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<T> {
    /// The answer itself.
    pub value: T,
    /// Name of the provider that produced it.
    pub provider: String,
    /// Attempts made against that provider; zero for cache hits.
    pub attempts: u32,
    /// Whether the answer was served from cache.
    pub from_cache: bool,
}

impl<T> Resolved<T> {
    /// Transform the value, keeping the provenance.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            value: f(self.value),
            provider: self.provider,
            attempts: self.attempts,
            from_cache: self.from_cache,
        }
    }

    fn cached(self) -> Self {
        Self {
            attempts: 0,
            from_cache: true,
            ..self
        }
    }
}

/// A geocoding backend.
///
/// Implementations perform a single attempt per call; retries, timeouts,
/// rate limiting and caching are applied by [`GeocodingService`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Short identifier used in result tags and logs.
    fn name(&self) -> &str;

    /// Find candidates for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the backend cannot answer.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError>;

    /// Describe the address at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NoResults`] when nothing is known about the
    /// point, or another variant when the backend cannot answer.
    async fn reverse(&self, location: Coordinate) -> Result<Address, ProviderError>;
}

/// Order candidates by importance (descending, missing counts as zero),
/// then by distance to `near` (ascending). The sort is stable, so provider
/// order breaks remaining ties.
pub fn rank(candidates: &mut [GeocodeCandidate], near: Option<Coordinate>) {
    candidates.sort_by(|a, b| {
        let by_importance = b
            .importance
            .unwrap_or(0.0)
            .total_cmp(&a.importance.unwrap_or(0.0));
        by_importance.then_with(|| {
            near.map_or(Ordering::Equal, |point| {
                HaversineEstimator::great_circle_m(a.location, point)
                    .total_cmp(&HaversineEstimator::great_circle_m(b.location, point))
            })
        })
    });
}

/// Trim and collapse internal whitespace; `None` when nothing remains.
pub(crate) fn collapse_whitespace(query: &str) -> Option<String> {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
