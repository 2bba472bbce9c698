//! TTL cache for geocoding answers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use carpool_core::Coordinate;
use moka::future::Cache;

use super::{Address, GeocodeCandidate, GeocodeError, Resolved, SearchOptions};

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocodeCacheConfig {
    /// How long an answer stays valid after it was fetched.
    pub ttl: Duration,
    /// Entries kept per lookup kind before eviction.
    pub max_capacity: u64,
}

impl Default for GeocodeCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_capacity: 1_000,
        }
    }
}

impl GeocodeCacheConfig {
    /// Set the time to live.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the per-kind capacity.
    #[must_use]
    pub const fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// Search and reverse answers keyed by normalised lookup.
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone)]
pub struct GeocodeCache {
    searches: Cache<String, Resolved<Vec<GeocodeCandidate>>>,
    reverses: Cache<String, Resolved<Address>>,
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new(GeocodeCacheConfig::default())
    }
}

impl GeocodeCache {
    /// Build empty caches.
    #[must_use]
    pub fn new(config: GeocodeCacheConfig) -> Self {
        Self {
            searches: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl)
                .build(),
            reverses: Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.ttl)
                .build(),
        }
    }

    /// Cached search answer for `key`, or the result of `fetch`.
    ///
    /// Concurrent callers with the same key share one `fetch`; only the
    /// caller that ran it sees `from_cache == false`. Errors are not cached.
    pub(super) async fn search_or_fetch(
        &self,
        key: String,
        fetch: impl Future<Output = Result<Resolved<Vec<GeocodeCandidate>>, GeocodeError>>,
    ) -> Result<Resolved<Vec<GeocodeCandidate>>, GeocodeError> {
        coalesce(&self.searches, key, fetch).await
    }

    /// Cached reverse answer for `key`, or the result of `fetch`.
    pub(super) async fn reverse_or_fetch(
        &self,
        key: String,
        fetch: impl Future<Output = Result<Resolved<Address>, GeocodeError>>,
    ) -> Result<Resolved<Address>, GeocodeError> {
        coalesce(&self.reverses, key, fetch).await
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.searches.invalidate_all();
        self.reverses.invalidate_all();
    }
}

async fn coalesce<V>(
    cache: &Cache<String, Resolved<V>>,
    key: String,
    fetch: impl Future<Output = Result<Resolved<V>, GeocodeError>>,
) -> Result<Resolved<V>, GeocodeError>
where
    V: Clone + Send + Sync + 'static,
{
    let entry = cache
        .entry(key)
        .or_try_insert_with(fetch)
        .await
        .map_err(Arc::unwrap_or_clone)?;
    if entry.is_fresh() {
        log::debug!("geocode cache miss for {}", entry.key());
        Ok(entry.into_value())
    } else {
        log::debug!("geocode cache hit for {}", entry.key());
        Ok(entry.into_value().cached())
    }
}

/// Key for a search: the lower-cased query plus every option that changes
/// the answer.
pub(super) fn search_key(normalised: &str, options: &SearchOptions) -> String {
    let near = options
        .near
        .map(|point| format!("{:.6},{:.6}", point.lat, point.lng))
        .unwrap_or_default();
    format!(
        "search|{}|{}|{near}|{}|{}",
        normalised.to_lowercase(),
        options.limit,
        options.country_codes.join(",").to_lowercase(),
        options.language.as_deref().unwrap_or_default(),
    )
}

/// Key for a reverse lookup, rounded to roughly ten centimetres.
pub(super) fn reverse_key(location: Coordinate) -> String {
    format!("reverse|{:.6}|{:.6}", location.lat, location.lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolved(name: &str) -> Resolved<Vec<GeocodeCandidate>> {
        Resolved {
            value: vec![GeocodeCandidate {
                location: Coordinate { lat: 1.0, lng: 2.0 },
                display_name: name.to_owned(),
                importance: None,
            }],
            provider: "stub".to_owned(),
            attempts: 1,
            from_cache: false,
        }
    }

    #[rstest]
    fn search_keys_ignore_case() {
        let options = SearchOptions::default();
        assert_eq!(
            search_key("Union Station", &options),
            search_key("union station", &options)
        );
    }

    #[rstest]
    fn search_keys_fold_in_options() {
        let plain = search_key("dallas", &SearchOptions::default());
        let limited = search_key("dallas", &SearchOptions::default().with_limit(1));
        let filtered = search_key("dallas", &SearchOptions::default().with_country_codes(["us"]));
        assert_ne!(plain, limited);
        assert_ne!(plain, filtered);
    }

    #[rstest]
    fn reverse_keys_round_tiny_differences() {
        let a = reverse_key(Coordinate { lat: 32.776_700_01, lng: -96.797 });
        let b = reverse_key(Coordinate { lat: 32.776_700_02, lng: -96.797 });
        assert_eq!(a, b);
    }

    async fn fetch_or_cached(cache: &GeocodeCache, key: &str) -> Resolved<Vec<GeocodeCandidate>> {
        cache
            .search_or_fetch(key.to_owned(), async {
                Ok::<_, GeocodeError>(resolved("fetched"))
            })
            .await
            .expect("fetch succeeds")
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = GeocodeCache::default();

        let first = fetch_or_cached(&cache, "k").await;
        let second = cache
            .search_or_fetch("k".to_owned(), async { Err(GeocodeError::InvalidQuery) })
            .await
            .expect("cached answer wins over the failing fetch");

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.attempts, 0);
        assert_eq!(second.value, first.value);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = GeocodeCache::default();
        let err = cache
            .search_or_fetch("k".to_owned(), async { Err(GeocodeError::InvalidQuery) })
            .await
            .expect_err("fetch fails");
        assert_eq!(err, GeocodeError::InvalidQuery);

        let retried = fetch_or_cached(&cache, "k").await;
        assert!(!retried.from_cache);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = GeocodeCache::new(
            GeocodeCacheConfig::default().with_ttl(Duration::from_millis(50)),
        );
        fetch_or_cached(&cache, "k").await;

        // moka keeps its own clock, so this needs real time to pass.
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(!fetch_or_cached(&cache, "k").await.from_cache);
    }

    #[tokio::test]
    async fn clear_drops_entries() {
        let cache = GeocodeCache::default();
        fetch_or_cached(&cache, "k").await;
        cache.clear();
        assert!(!fetch_or_cached(&cache, "k").await.from_cache);
    }
}
