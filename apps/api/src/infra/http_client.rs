//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (Google OAuth, Android Publisher) are built here rather
//! than constructing `reqwest::Client` directly.

use reqwest::Client;
use std::time::Duration;

use super::InfraError;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build an HTTP client whose total request time is bounded by `request_timeout`.
pub fn build_client(request_timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
        .map_err(InfraError::HttpClient)
}
