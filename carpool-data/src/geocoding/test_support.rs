//! Test utilities for geocoding.
//!
//! [`ScriptedGeocoder`] answers from a script instead of the network and
//! counts how often it was asked.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use carpool_core::Coordinate;

use super::{Address, GeocodeCandidate, Geocoder, ProviderError, SearchOptions};

#[derive(Debug, Clone)]
enum Answer {
    Candidates,
    Empty,
    Fail(ProviderError),
}

/// Deterministic [`Geocoder`] double.
///
/// By default every search answers two candidates derived from the query,
/// `"{query}"` with importance 0.3 and `"{query} (best)"` with importance
/// 0.9, and every reverse lookup answers an address naming the point.
/// Queued one-off answers are consumed before the default applies. Clones
/// share the script and the call counter.
///
/// # Example
///
/// ```
/// use carpool_data::geocoding::test_support::ScriptedGeocoder;
/// use carpool_data::geocoding::{Geocoder, ProviderError, SearchOptions};
///
/// # tokio::runtime::Builder::new_current_thread().build()?.block_on(async {
/// let geocoder = ScriptedGeocoder::new("stub").fail_first(ProviderError::NoResults);
/// assert!(geocoder.search("dallas", &SearchOptions::default()).await.is_err());
/// assert_eq!(geocoder.search("dallas", &SearchOptions::default()).await?.len(), 2);
/// assert_eq!(geocoder.calls(), 2);
/// # Ok::<(), ProviderError>(())
/// # })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedGeocoder {
    name: String,
    queued: Arc<Mutex<VecDeque<Answer>>>,
    fallback: Answer,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl ScriptedGeocoder {
    /// A geocoder that always answers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Answer::Candidates,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call with `error` once the queue is drained.
    #[must_use]
    pub fn failing_with(mut self, error: ProviderError) -> Self {
        self.fallback = Answer::Fail(error);
        self
    }

    /// Answer every search with no candidates once the queue is drained.
    #[must_use]
    pub fn empty(mut self) -> Self {
        self.fallback = Answer::Empty;
        self
    }

    /// Fail the next call with `error`.
    #[must_use]
    pub fn fail_first(self, error: ProviderError) -> Self {
        self.push(Answer::Fail(error));
        self
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls made so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(&self, answer: Answer) {
        if let Ok(mut queued) = self.queued.lock() {
            queued.push_back(answer);
        }
    }

    async fn next(&self) -> Answer {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.queued
            .lock()
            .ok()
            .and_then(|mut queued| queued.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        match self.next().await {
            Answer::Candidates => Ok(vec![
                GeocodeCandidate {
                    location: Coordinate { lat: 32.7767, lng: -96.7970 },
                    display_name: query.to_owned(),
                    importance: Some(0.3),
                },
                GeocodeCandidate {
                    location: Coordinate { lat: 32.7803, lng: -96.8060 },
                    display_name: format!("{query} (best)"),
                    importance: Some(0.9),
                },
            ]),
            Answer::Empty => Ok(Vec::new()),
            Answer::Fail(error) => Err(error),
        }
    }

    async fn reverse(&self, location: Coordinate) -> Result<Address, ProviderError> {
        match self.next().await {
            Answer::Candidates => Ok(Address {
                display_name: format!("near {location}"),
                location: Some(location),
                ..Address::default()
            }),
            Answer::Empty => Err(ProviderError::NoResults),
            Answer::Fail(error) => Err(error),
        }
    }
}
