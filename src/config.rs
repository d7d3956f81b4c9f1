//! Client configuration: endpoint, credential, timeout, proxy and retry window.
//!
//! Configuration is validated once when built, so table operations never see
//! a malformed endpoint or an API key that cannot be sent as a header.

use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::constants::{
    API_KEY_ENV, DEFAULT_ENDPOINT_URL, DEFAULT_MAX_RETRIES, DEFAULT_WAIT_MAX_SECS,
    DEFAULT_WAIT_MIN_SECS, ENDPOINT_URL_ENV,
};
use crate::error::ClientError;
use crate::retry::{RetryConfigError, RetryPolicy, validate_wait_bounds};

/// Errors detected while building a [`Configuration`] or the transport for it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was provided.
    #[error("API key is missing (set AIRTABLE_API_KEY or pass --api-key)")]
    MissingApiKey,

    /// The API key cannot be sent in an `Authorization` header.
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,

    /// The endpoint is not an absolute URL that can carry path segments.
    #[error("invalid endpoint URL: {url}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        url: String,
    },

    /// Retry wait bounds are invalid.
    #[error("invalid retry settings: {0}")]
    Retry(#[from] RetryConfigError),

    /// The HTTP client could not be built (e.g. bad proxy).
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[source] reqwest::Error),
}

/// HTTP proxy used for all requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfiguration {
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

/// Retry window and budget for rate-limited (HTTP 429) responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Minimum wait between attempts, in seconds.
    pub wait_min_secs: u64,
    /// Maximum wait between attempts (exclusive), in seconds.
    pub wait_max_secs: u64,
    /// Retries after the initial attempt.
    pub retries: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            wait_min_secs: DEFAULT_WAIT_MIN_SECS,
            wait_max_secs: DEFAULT_WAIT_MAX_SECS,
            retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetrySettings {
    /// Builds the rate-limit retry policy described by these settings.
    ///
    /// # Errors
    ///
    /// Returns [`RetryConfigError`] for invalid wait bounds.
    pub fn to_policy(&self) -> Result<RetryPolicy<ClientError>, RetryConfigError> {
        RetryPolicy::builder()
            .retries(self.retries)
            .wait_min_secs(self.wait_min_secs)
            .wait_max_secs(self.wait_max_secs)
            .rate_limited()
            .build()
    }
}

/// Validated client configuration.
#[derive(Clone)]
pub struct Configuration {
    endpoint_url: Url,
    api_key: String,
    timeout: Option<Duration>,
    proxy: Option<ProxyConfiguration>,
    retry: RetrySettings,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("endpoint_url", &self.endpoint_url.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Configuration {
    /// Starts a builder for the given API key.
    pub fn builder(api_key: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder {
            api_key: api_key.into(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            timeout: None,
            proxy: None,
            retry: RetrySettings::default(),
        }
    }

    /// Builds a configuration from `AIRTABLE_API_KEY` and, if set,
    /// `AIRTABLE_ENDPOINT_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when the key is unset or blank,
    /// and any validation error from [`ConfigurationBuilder::build`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder_from_env(None, None)?.build()
    }

    /// Starts a builder whose key and endpoint come from the given overrides,
    /// falling back to `AIRTABLE_API_KEY` and `AIRTABLE_ENDPOINT_URL`.
    ///
    /// Blank values are treated as absent at every level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when neither the override nor
    /// the environment provides a key.
    pub fn builder_from_env(
        api_key: Option<String>,
        endpoint_url: Option<String>,
    ) -> Result<ConfigurationBuilder, ConfigError> {
        let api_key = non_blank(api_key)
            .or_else(|| env_value(API_KEY_ENV))
            .ok_or(ConfigError::MissingApiKey)?;
        let mut builder = Self::builder(api_key);
        if let Some(endpoint) = non_blank(endpoint_url).or_else(|| env_value(ENDPOINT_URL_ENV)) {
            builder = builder.endpoint_url(endpoint);
        }
        Ok(builder)
    }

    /// Returns the endpoint URL, including the API version segment.
    #[must_use]
    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint_url
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the request timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the proxy, if any.
    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyConfiguration> {
        self.proxy.as_ref()
    }

    /// Returns the retry settings for rate-limited responses.
    #[must_use]
    pub fn retry(&self) -> RetrySettings {
        self.retry
    }

    /// Returns the `Authorization` header value for the API key.
    pub(crate) fn authorization_header(&self) -> Result<HeaderValue, ConfigError> {
        bearer_header(&self.api_key)
    }
}

/// Builder for [`Configuration`].
#[derive(Clone)]
pub struct ConfigurationBuilder {
    api_key: String,
    endpoint_url: String,
    timeout: Option<Duration>,
    proxy: Option<ProxyConfiguration>,
    retry: RetrySettings,
}

impl ConfigurationBuilder {
    /// Overrides the endpoint URL (default `https://api.airtable.com/v0`).
    #[must_use]
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Routes requests through an HTTP proxy.
    #[must_use]
    pub fn proxy(mut self, host: impl Into<String>, port: u16) -> Self {
        self.proxy = Some(ProxyConfiguration {
            host: host.into(),
            port,
        });
        self
    }

    /// Overrides the rate-limit retry settings.
    #[must_use]
    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a blank or non-header-safe API key, an
    /// endpoint that is not an absolute hierarchical URL, or invalid retry
    /// bounds.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        let api_key = self.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        bearer_header(&api_key)?;

        let endpoint_url =
            Url::parse(self.endpoint_url.trim()).map_err(|_| ConfigError::InvalidEndpoint {
                url: self.endpoint_url.clone(),
            })?;
        if endpoint_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint {
                url: self.endpoint_url,
            });
        }

        validate_wait_bounds(self.retry.wait_min_secs, self.retry.wait_max_secs)?;

        Ok(Configuration {
            endpoint_url,
            api_key,
            timeout: self.timeout,
            proxy: self.proxy,
            retry: self.retry,
        })
    }
}

fn bearer_header(api_key: &str) -> Result<HeaderValue, ConfigError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| ConfigError::InvalidApiKey)?;
    value.set_sensitive(true);
    Ok(value)
}

fn env_value(name: &str) -> Option<String> {
    non_blank(std::env::var(name).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
