//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use url::Url;

/// Errors raised while constructing HTTP-backed estimators and geocoders.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The configured base URL could not be parsed.
    #[error("invalid base URL {url}: {source}")]
    BaseUrl {
        /// The rejected URL.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> Result<Client, BuildError> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(BuildError::HttpClient)
}

/// Parse `raw` as a base URL that relative paths can be joined onto.
pub(crate) fn base_url(raw: &str) -> Result<Url, BuildError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|source| BuildError::BaseUrl {
        url: raw.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://nominatim.example.org", "https://nominatim.example.org/search")]
    #[case("https://example.org/geo/", "https://example.org/geo/search")]
    #[case("https://example.org/geo", "https://example.org/geo/search")]
    fn joins_relative_paths(#[case] raw: &str, #[case] expected: &str) {
        let base = base_url(raw).expect("base URL should parse");
        let joined = base.join("search").expect("join should succeed");
        assert_eq!(joined.as_str(), expected);
    }

    #[rstest]
    fn rejects_relative_base() {
        let err = base_url("not a url").expect_err("relative URLs are rejected");
        assert!(matches!(err, BuildError::BaseUrl { .. }));
    }
}
