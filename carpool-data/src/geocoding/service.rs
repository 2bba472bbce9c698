//! Provider chain with caching, rate limiting and retries.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use carpool_core::Coordinate;

use super::cache::{GeocodeCache, reverse_key, search_key};
use super::{
    Address, GeocodeCandidate, GeocodeError, Geocoder, ProviderError, ProviderFailure, Resolved,
    SearchOptions, collapse_whitespace, rank,
};
use crate::{RateLimiter, RetryPolicy};

/// Default per-attempt timeout for a provider slot.
const DEFAULT_SLOT_TIMEOUT: Duration = Duration::from_secs(10);

/// A provider with its own timeout and retry schedule.
#[derive(Clone)]
pub struct GeocoderSlot {
    geocoder: Arc<dyn Geocoder>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl fmt::Debug for GeocoderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeocoderSlot")
            .field("geocoder", &self.geocoder.name())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl GeocoderSlot {
    /// Wrap `geocoder` with the default timeout and retry policy.
    #[must_use]
    pub fn new(geocoder: impl Geocoder + 'static) -> Self {
        Self::shared(Arc::new(geocoder))
    }

    /// Wrap an already shared geocoder.
    #[must_use]
    pub fn shared(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            timeout: DEFAULT_SLOT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Bound each attempt.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry schedule.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The wrapped provider's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.geocoder.name()
    }
}

type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// One kind of lookup the chain can run.
trait Lookup: Sync {
    type Output: Send;

    fn call<'a>(&'a self, geocoder: &'a dyn Geocoder) -> ProviderFuture<'a, Self::Output>;

    /// Whether a successful answer carries nothing usable.
    fn is_empty(output: &Self::Output) -> bool;

    /// Label used in logs and [`GeocodeError::NotFound`].
    fn describe(&self) -> String;
}

struct SearchLookup<'q> {
    query: &'q str,
    options: &'q SearchOptions,
}

impl Lookup for SearchLookup<'_> {
    type Output = Vec<GeocodeCandidate>;

    fn call<'a>(&'a self, geocoder: &'a dyn Geocoder) -> ProviderFuture<'a, Self::Output> {
        geocoder.search(self.query, self.options)
    }

    fn is_empty(output: &Self::Output) -> bool {
        output.is_empty()
    }

    fn describe(&self) -> String {
        format!("{:?}", self.query)
    }
}

struct ReverseLookup {
    location: Coordinate,
}

impl Lookup for ReverseLookup {
    type Output = Address;

    fn call<'a>(&'a self, geocoder: &'a dyn Geocoder) -> ProviderFuture<'a, Self::Output> {
        geocoder.reverse(self.location)
    }

    fn is_empty(_: &Self::Output) -> bool {
        false
    }

    fn describe(&self) -> String {
        self.location.to_string()
    }
}

/// Geocoding front door: cache, then each provider in order.
///
/// Every outbound attempt is admitted through the shared [`RateLimiter`],
/// so sharing one limiter between the service and the routing estimator
/// keeps the combined request rate within budget.
#[derive(Debug, Clone)]
pub struct GeocodingService {
    slots: Vec<GeocoderSlot>,
    cache: GeocodeCache,
    limiter: Arc<RateLimiter>,
}

impl GeocodingService {
    /// Create a service with no providers and a default cache.
    #[must_use]
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            slots: Vec::new(),
            cache: GeocodeCache::default(),
            limiter,
        }
    }

    /// Append a provider to the chain.
    #[must_use]
    pub fn with_provider(mut self, slot: GeocoderSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Replace the cache.
    #[must_use]
    pub fn with_cache(mut self, cache: GeocodeCache) -> Self {
        self.cache = cache;
        self
    }

    /// The cache backing this service.
    #[must_use]
    pub const fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Search for `query`, returning ranked candidates.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::InvalidQuery`] for a blank query.
    /// - [`GeocodeError::InvalidCoordinate`] for an invalid `near` point.
    /// - [`GeocodeError::NotFound`] when every provider answered empty.
    /// - [`GeocodeError::Exhausted`] when every provider failed.
    /// - [`GeocodeError::RateLimitTimeout`] when the limiter gave up.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved<Vec<GeocodeCandidate>>, GeocodeError> {
        let normalised = collapse_whitespace(query).ok_or(GeocodeError::InvalidQuery)?;
        if let Some(near) = options.near {
            near.validate()?;
        }

        let key = search_key(&normalised, options);
        let lookup = SearchLookup {
            query: &normalised,
            options,
        };
        self.cache
            .search_or_fetch(key, async {
                let mut resolved = self.run_chain(&lookup).await?;
                rank(&mut resolved.value, options.near);
                resolved.value.truncate(options.limit);
                Ok(resolved)
            })
            .await
    }

    /// Resolve `query` to its top-ranked candidate.
    ///
    /// # Errors
    ///
    /// As for [`GeocodingService::search`].
    pub async fn resolve(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Resolved<GeocodeCandidate>, GeocodeError> {
        let resolved = self.search(query, options).await?;
        let Some(top) = resolved.value.first().cloned() else {
            return Err(GeocodeError::NotFound {
                query: query.to_owned(),
            });
        };
        Ok(resolved.map(|_| top))
    }

    /// Describe the address at `location`.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::InvalidCoordinate`] when `location` is off the globe.
    /// - Otherwise as for [`GeocodingService::search`].
    pub async fn reverse(&self, location: Coordinate) -> Result<Resolved<Address>, GeocodeError> {
        location.validate()?;

        self.cache
            .reverse_or_fetch(reverse_key(location), async {
                self.run_chain(&ReverseLookup { location }).await
            })
            .await
    }

    async fn attempt<L: Lookup>(
        &self,
        slot: &GeocoderSlot,
        lookup: &L,
    ) -> Result<L::Output, ProviderError> {
        self.limiter.acquire().await?;
        match tokio::time::timeout(slot.timeout, lookup.call(slot.geocoder.as_ref())).await {
            Ok(Ok(output)) if L::is_empty(&output) => Err(ProviderError::NoResults),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                after: slot.timeout,
            }),
        }
    }

    async fn run_chain<L: Lookup>(&self, lookup: &L) -> Result<Resolved<L::Output>, GeocodeError> {
        if self.slots.is_empty() {
            return Err(GeocodeError::NoProviders);
        }

        let mut failures = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let (result, attempts) = slot
                .retry
                .run(ProviderError::is_transient, || self.attempt(slot, lookup))
                .await;
            match result {
                Ok(value) => {
                    return Ok(Resolved {
                        value,
                        provider: slot.name().to_owned(),
                        attempts,
                        from_cache: false,
                    });
                }
                Err(ProviderError::RateLimited(timeout)) => {
                    return Err(GeocodeError::RateLimitTimeout(timeout));
                }
                Err(error) => {
                    log::warn!(
                        "geocoder {} gave up on {} after {attempts} attempt(s): {error}",
                        slot.name(),
                        lookup.describe(),
                    );
                    failures.push(ProviderFailure {
                        provider: slot.name().to_owned(),
                        attempts,
                        error,
                    });
                }
            }
        }

        if failures
            .iter()
            .all(|failure| failure.error == ProviderError::NoResults)
        {
            Err(GeocodeError::NotFound {
                query: lookup.describe(),
            })
        } else {
            Err(GeocodeError::Exhausted { failures })
        }
    }
}
