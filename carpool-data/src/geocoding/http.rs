//! Shared plumbing for HTTP geocoding providers.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::ProviderError;
use crate::client::{BuildError, base_url, http_client};

/// Default user agent for geocoding requests.
pub const DEFAULT_USER_AGENT: &str = "carpool-geocoding/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration shared by the HTTP geocoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpGeocoderConfig {
    /// Service root, e.g. `"https://nominatim.openstreetmap.org"`.
    pub base_url: String,
    /// User agent sent with every request. Public instances require one
    /// that identifies the application.
    pub user_agent: String,
    /// Client-level request timeout.
    pub timeout: Duration,
    /// Optional API key, sent as the `key` query parameter.
    pub api_key: Option<String>,
}

impl HttpGeocoderConfig {
    /// Create a configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_key: None,
        }
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Clone)]
pub(super) struct HttpBackend {
    client: Client,
    base: Url,
    timeout: Duration,
    api_key: Option<String>,
}

impl HttpBackend {
    pub(super) fn new(config: &HttpGeocoderConfig) -> Result<Self, BuildError> {
        Ok(Self {
            client: http_client(&config.user_agent, config.timeout)?,
            base: base_url(&config.base_url)?,
            timeout: config.timeout,
            api_key: config.api_key.clone(),
        })
    }

    /// Build `{base}/{path}?{params}[&key=...]`.
    pub(super) fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| ProviderError::InvalidRequest {
                message: format!("cannot join {path} onto {}: {err}", self.base),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, value);
            }
            if let Some(key) = &self.api_key {
                pairs.append_pair("key", key);
            }
        }
        Ok(url)
    }

    pub(super) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err))?;

        response.json().await.map_err(|err| ProviderError::Parse {
            message: err.to_string(),
        })
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::Timeout {
                after: self.timeout,
            };
        }
        if let Some(status) = error.status() {
            return ProviderError::Http {
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        ProviderError::Network {
            message: error.to_string(),
        }
    }
}

/// Parse a coordinate component that may arrive as a JSON string.
pub(super) fn parse_degrees(raw: &str, what: &str) -> Result<f64, ProviderError> {
    raw.trim().parse().map_err(|_| ProviderError::Parse {
        message: format!("{what} {raw:?} is not a number"),
    })
}
