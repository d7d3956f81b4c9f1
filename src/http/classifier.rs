//! Turns raw HTTP outcomes into typed errors.
//!
//! Any status other than 200 is an error, including other 2xx codes. The
//! error body is decoded as `{"error": {"type", "message"}}`; when that fails
//! an `UNDEFINED_ERROR` carrying the raw body is synthesized instead.

use serde::Deserialize;
use tracing::warn;

use super::transport::HttpResponse;
use crate::constants::{SUCCESS_STATUS, UNDEFINED_ERROR_TYPE};
use crate::error::{ApiError, BoxError, ClientError};

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Passes a 200 response through unchanged and converts anything else to a
/// [`ClientError::Server`].
///
/// # Errors
///
/// Returns [`ClientError::Server`] for every status other than 200.
pub fn classify(response: HttpResponse) -> Result<HttpResponse, ClientError> {
    if response.status == SUCCESS_STATUS {
        return Ok(response);
    }

    let api_error = extract_api_error(&response.body);
    Err(ClientError::server(
        response.status,
        response.status_text,
        Some(api_error),
    ))
}

/// Classifies a failure where no response was received as a status-500
/// server error carrying the original cause.
#[must_use]
pub fn classify_transport_failure(cause: BoxError) -> ClientError {
    ClientError::transport(cause)
}

fn extract_api_error(body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error,
        Err(e) => {
            warn!(body = %body, error = %e, "failed to parse response body to error");
            ApiError::new(UNDEFINED_ERROR_TYPE, body)
        }
    }
}
