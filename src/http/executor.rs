//! Single choke point through which every table request is sent.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use super::classifier::{classify, classify_transport_failure};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::ClientError;
use crate::retry::RetryPolicy;

/// Sends requests, classifies outcomes and retries rate-limited responses.
///
/// The executor holds no per-request state, so one instance is shared by
/// every table client and may serve any number of concurrent calls.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy<ClientError>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Creates an executor retrying 429 responses with the default policy
    /// (5 retries, 30-36s apart).
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_retry_policy(transport, RetryPolicy::rate_limited())
    }

    /// Creates an executor with a custom retry policy.
    #[must_use]
    pub fn with_retry_policy(
        transport: Arc<dyn Transport>,
        retry_policy: RetryPolicy<ClientError>,
    ) -> Self {
        Self {
            transport,
            retry_policy,
        }
    }

    /// Returns the retry policy applied to every request.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy<ClientError> {
        &self.retry_policy
    }

    /// Sends `request`, retrying according to the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Server`] for non-200 responses and transport
    /// failures (status 500) once retries are exhausted or the failure is not
    /// retryable.
    #[instrument(level = "debug", skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.retry_policy
            .run(|| {
                let request = request.clone();
                async move {
                    let response = self
                        .transport
                        .send(request)
                        .await
                        .map_err(classify_transport_failure)?;
                    debug!(status = response.status, "received response");
                    classify(response)
                }
            })
            .await
    }
}
