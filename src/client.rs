//! Core HTTP client for the Alpha Vantage REST API.
//!
//! The [`QuoteClient`] struct wraps [`reqwest::Client`] with the API key,
//! the base URL, and a bounded request timeout. Every Alpha Vantage function
//! is served from the same `/query` endpoint, so the client exposes a single
//! typed [`query`](QuoteClient::query) helper.
//!
//! Endpoint methods are added to `QuoteClient` via `impl` blocks in the
//! [`crate::api`] module.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::constants::{API_BASE_URL, DEFAULT_REQUEST_TIMEOUT, QUERY_PATH};
use crate::error::{RelayError, Result};

/// Core HTTP client for the Alpha Vantage REST API.
///
/// # Example
///
/// ```no_run
/// use quote_relay::client::QuoteClient;
///
/// # #[tokio::main]
/// # async fn main() -> quote_relay::error::Result<()> {
/// let client = QuoteClient::new("your-api-key")?;
/// let quote = client.get_global_quote("AAPL").await?;
/// println!("{} {}", quote.symbol, quote.price);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    api_key: String,
    /// Base URL for REST API requests (defaults to [`API_BASE_URL`]).
    base_url: String,
}

impl QuoteClient {
    /// Create a client for the public Alpha Vantage endpoint with the default
    /// request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client pointing at a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RelayError::Config("API key is empty".into()));
        }

        let http = reqwest::Client::builder()
            .default_headers(Self::default_headers())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Returns a reference to the underlying `reqwest::Client`.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `GET /query?function=<function>&...&apikey=<key>` and deserialize
    /// the JSON response.
    pub async fn query<R: DeserializeOwned>(
        &self,
        function: &str,
        params: &[(&str, &str)],
    ) -> Result<R> {
        let url = self.url(function, params)?;
        // The key is part of the query string; log the function only.
        tracing::debug!(function, ?params, "GET");

        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn url(&self, function: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{QUERY_PATH}", self.base_url))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("function", function);
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("apikey", &self.api_key);
        }
        Ok(url)
    }

    /// Default headers applied to every request.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Read a response, returning either the deserialized body or a
    /// [`RelayError::HttpStatus`].
    async fn handle_response<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(RelayError::Json)
        } else {
            Err(RelayError::HttpStatus {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        }
    }
}
