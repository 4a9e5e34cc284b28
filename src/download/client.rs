//! HTTP client wrapper for streaming downloads and header probes.
//!
//! Thin layer over `reqwest` that owns the two network operations the engine
//! needs: a streaming GET (body consumed chunk by chunk by the worker) and a
//! short-timeout HEAD probe used for extension sniffing.

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, PROBE_TIMEOUT};
use super::error::TransferError;
use crate::user_agent::BROWSER_USER_AGENT;

/// HTTP client for streaming downloads.
///
/// Created once and shared by all workers to reuse the connection pool. The
/// connect/headers phase is bounded by a short timeout; the body stream has
/// no overall deadline (cancellation is cooperative, per chunk).
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default connect timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_connect_timeout(CONNECT_TIMEOUT_SECS)
    }

    /// Creates a client with an explicit connect timeout in seconds.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the supplied
    /// configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_connect_timeout(connect_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Opens a streaming GET for `url` and validates the response status.
    ///
    /// The returned response's body has not been read; callers consume it
    /// via `bytes_stream()`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidUrl`] for unparseable URLs,
    /// [`TransferError::Timeout`] when the connect phase times out,
    /// [`TransferError::HttpStatus`] for non-success statuses, and
    /// [`TransferError::Network`] for other request failures.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_stream(&self, url: &str) -> Result<reqwest::Response, TransferError> {
        Url::parse(url).map_err(|_| TransferError::invalid_url(url))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransferError::timeout(url)
            } else {
                TransferError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::http_status(url, status.as_u16()));
        }

        Ok(response)
    }

    /// Issues a header-only request and returns the lowercased Content-Type.
    ///
    /// Bounded by a short per-request timeout. All failures (bad URL,
    /// network, error status, missing header) collapse to `None`; the probe
    /// is advisory and must never propagate errors.
    #[instrument(level = "debug", skip(self))]
    pub async fn probe_content_type(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .head(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "probe returned error status");
            return None;
        }

        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}
