//! Airtable Client Library
//!
//! Typed async access to the records of Airtable tables: listing with lazy
//! cursor-following pagination, find, create, update and delete. Responses
//! other than `200` become [`ClientError::Server`], and rate-limited (`429`)
//! requests are retried after a randomized wait.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`base`] - Client entry point and per-base table registry
//! - [`table`] - Per-table operations and page streams
//! - [`query`] - List query parameters
//! - [`http`] - Transport, response classification and request execution
//! - [`retry`] - Generic retry policy with randomized waits
//! - [`blocking`] - Synchronous adapter over the async table client
//! - [`config`] - Endpoint, credential, proxy and retry configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod base;
pub mod blocking;
pub mod config;
pub mod constants;
pub mod error;
pub mod http;
pub mod query;
pub mod record;
pub mod retry;
pub mod table;

// Re-export commonly used types
pub use base::{Airtable, Base};
pub use blocking::BlockingTableClient;
pub use config::{
    ConfigError, Configuration, ConfigurationBuilder, ProxyConfiguration, RetrySettings,
};
pub use error::{ApiError, BoxError, ClientError, ErrorKind};
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, RequestExecutor, Transport};
pub use query::{QuerySpec, QuerySpecBuilder, Sort, SortDirection};
pub use record::{Deleted, Page, Record};
pub use retry::{RetryConfigError, RetryDecision, RetryPolicy};
pub use table::{PageStream, RecordStream, TableClient};
