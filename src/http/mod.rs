//! Request execution pipeline.
//!
//! - [`Transport`] - sends a request and reads the response
//! - [`classify`] - turns non-200 responses into [`ClientError::Server`](crate::ClientError::Server)
//! - [`RequestExecutor`] - sends, classifies and retries rate-limited requests

mod classifier;
mod executor;
mod transport;

pub use classifier::{classify, classify_transport_failure};
pub use executor::RequestExecutor;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, USER_AGENT};
