//! Upstream HTTP fetch layer.
//!
//! The gateway never talks to reqwest directly; it drives the [`Network`]
//! trait so strategy logic can be exercised against a scripted network in
//! tests. [`FetchClient`] is the production implementation.
//!
//! A non-success HTTP status is not an error here: strategies inspect the
//! status to decide whether to cache, but an upstream 404 still flows back
//! to the caller. Only transport failures (DNS, connect, timeout, reset)
//! surface as `Error::Network`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};

use arkalia_core::{CacheEntry, Error};

use crate::request::Request;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "arkalia-sw/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "arkalia-sw/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response from an upstream fetch.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The final URL after redirects
    pub final_url: reqwest::Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchedResponse {
    /// Convert into a store entry for the originating request.
    ///
    /// The entry is keyed by the request, not the final URL, so a cached
    /// redirect target is found again under the URL the page asked for.
    pub fn to_entry(&self, request: &Request) -> CacheEntry {
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        CacheEntry {
            key: request.cache_key(),
            method: request.method.to_string(),
            url: request.url.to_string(),
            status: self.status.as_u16(),
            content_type: self.content_type.clone(),
            headers_json: serde_json::to_string(&headers).ok(),
            body: self.bytes.to_vec(),
            inserted_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The network as seen by the gateway.
///
/// `FetchClient` implements this against the real origin; tests implement
/// it with scripted responses and failure injection.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request from upstream.
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` only for transport-level failures.
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        if let Some(accept) = &request.accept {
            builder = builder.header(header::ACCEPT, accept);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {e}", request.url)))?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {e}")))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            url = %request.url,
            %final_url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms,
            "upstream fetch"
        );

        Ok(FetchedResponse { final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
