//! Error types for table operations.
//!
//! Every table operation fails with a [`ClientError`]. The variants mirror the
//! three ways a request can go wrong: the body could not be mapped to or from
//! JSON, the server answered with something other than `200`, or no response
//! arrived at all (folded into a server error with status 500).

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::constants::{TRANSPORT_FAILURE_STATUS, TRANSPORT_FAILURE_STATUS_TEXT};

/// Boxed error used for transport-level causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured error returned by the API in the body of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// Error category code, e.g. `INVALID_REQUEST_UNKNOWN`.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// Creates an API error from its parts.
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_type, self.message)
    }
}

/// Category of a [`ClientError`], used by category-based retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request or response body could not be (de)serialized.
    Mapping,
    /// Non-200 response or transport failure.
    Server,
    /// A request URL could not be derived.
    InvalidUrl,
    /// The blocking adapter could not start its runtime.
    Runtime,
    /// A dedicated HTTP client could not be built from the configuration.
    Config,
}

/// Errors surfaced by table operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Body could not be serialized or deserialized. Never retried.
    #[error("failed to map {context}: {source}")]
    Mapping {
        /// What was being mapped.
        context: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The server answered with a status other than 200, or no response was received.
    #[error("{}", server_message(*status, status_text, error.as_ref()))]
    Server {
        /// HTTP status code (500 for transport failures).
        status: u16,
        /// HTTP status text.
        status_text: String,
        /// Structured error decoded from the body, absent for transport failures.
        error: Option<ApiError>,
        /// Transport failure that prevented a response, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A request URL could not be built from the table URL.
    #[error("invalid request URL: {url}")]
    InvalidUrl {
        /// The URL that could not be extended.
        url: String,
    },

    /// The blocking adapter failed to start its runtime.
    #[error("failed to start blocking runtime: {source}")]
    Runtime {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking adapter could not build its own HTTP transport.
    #[error("failed to build client from configuration: {source}")]
    Config {
        /// The configuration error.
        #[source]
        source: ConfigError,
    },
}

fn server_message(status: u16, status_text: &str, error: Option<&ApiError>) -> String {
    match error {
        Some(api_error) => format!("HTTP {status} {status_text}: {api_error}"),
        None => format!("HTTP {status} {status_text}"),
    }
}

impl ClientError {
    /// Creates a mapping error.
    pub fn mapping(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Mapping {
            context: context.into(),
            source,
        }
    }

    /// Creates a server error for a received non-200 response.
    pub fn server(status: u16, status_text: impl Into<String>, error: Option<ApiError>) -> Self {
        Self::Server {
            status,
            status_text: status_text.into(),
            error,
            source: None,
        }
    }

    /// Creates a server error for a request that never produced a response.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Self::Server {
            status: TRANSPORT_FAILURE_STATUS,
            status_text: TRANSPORT_FAILURE_STATUS_TEXT.to_string(),
            error: None,
            source: Some(source.into()),
        }
    }

    /// Creates a configuration error.
    pub fn config(source: ConfigError) -> Self {
        Self::Config { source }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mapping { .. } => ErrorKind::Mapping,
            Self::Server { .. } => ErrorKind::Server,
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::Runtime { .. } => ErrorKind::Runtime,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Returns the HTTP status for server errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the decoded API error for server errors that carried one.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Server { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}
