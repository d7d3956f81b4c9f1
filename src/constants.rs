//! Constants for the client (endpoint, paging limits, retry windows, timeouts).

/// Default Airtable REST endpoint, including the API version segment.
pub const DEFAULT_ENDPOINT_URL: &str = "https://api.airtable.com/v0";

/// The only status code treated as success.
pub const SUCCESS_STATUS: u16 = 200;

/// Status returned by the server when a client exceeds its rate limit.
pub const RATE_LIMIT_STATUS: u16 = 429;

/// Status assigned to failures where no response was received.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Status text paired with [`TRANSPORT_FAILURE_STATUS`].
pub const TRANSPORT_FAILURE_STATUS_TEXT: &str = "Internal server error";

/// Error type synthesized when an error body cannot be decoded.
pub const UNDEFINED_ERROR_TYPE: &str = "UNDEFINED_ERROR";

/// Largest page size the server accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default minimum wait before retrying a rate-limited request (seconds).
pub const DEFAULT_WAIT_MIN_SECS: u64 = 30;

/// Default maximum wait before retrying a rate-limited request (seconds, exclusive).
pub const DEFAULT_WAIT_MAX_SECS: u64 = 36;

/// Largest accepted retry wait bound (seconds), so waits fit in `u64` milliseconds.
pub const MAX_WAIT_SECS: u64 = u64::MAX / 1000;

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "AIRTABLE_API_KEY";

/// Environment variable overriding the endpoint URL.
pub const ENDPOINT_URL_ENV: &str = "AIRTABLE_ENDPOINT_URL";
