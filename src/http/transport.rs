//! HTTP transport seam.
//!
//! The rest of the crate talks to the network only through [`Transport`], so
//! tests can substitute a scripted transport and callers can plug in their own
//! client. [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Method, Proxy};
use tracing::debug;
use url::Url;

use crate::config::{ConfigError, Configuration};
use crate::constants::CONNECT_TIMEOUT_SECS;
use crate::error::BoxError;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("airtable-client/", env!("CARGO_PKG_VERSION"));

/// A fully built request, ready to be sent (possibly more than once).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL including query parameters.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Serialized body for write requests.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A received response with its body read to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Canonical reason phrase for the status, empty when unknown.
    pub status_text: String,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response from its parts.
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }
}

/// Sends requests over the network.
///
/// Implementations return `Err` only when no response was received
/// (connection failure, timeout, body read failure). Any status code,
/// including errors, is a successful send.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and reads the full response body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the timeout and proxy settings of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Transport`] when the proxy URL is invalid or the
    /// client cannot be constructed.
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigError> {
        let mut builder = base_client_builder(config.timeout());
        if let Some(proxy) = config.proxy() {
            let proxy_url = format!("http://{}:{}", proxy.host, proxy.port);
            debug!(proxy = %proxy_url, "using proxy");
            builder = builder.proxy(Proxy::all(&proxy_url).map_err(ConfigError::Transport)?);
        }
        let client = builder.build().map_err(ConfigError::Transport)?;
        Ok(Self { client })
    }
}

fn base_client_builder(timeout: Option<Duration>) -> ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
