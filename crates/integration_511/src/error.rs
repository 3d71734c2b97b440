//! 511 fetch error types

use thiserror::Error;

/// Errors that can occur while fetching from the 511 API
#[derive(Debug, Error)]
pub enum Transit511Error {
    /// Credential rejected (HTTP 401/403)
    #[error("Authentication failed (HTTP {status})")]
    AuthFailure {
        /// HTTP status code returned
        status: u16,
    },

    /// Rate limit exceeded, by status code or by the quota message body
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Upstream explanation (status line or body sentence)
        message: String,
        /// Seconds to wait before retrying (if provided by API)
        retry_after_secs: Option<u64>,
    },

    /// Empty body, non-JSON body, or JSON that does not parse
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Timeout, connection error, or unexpected HTTP status
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Transit511Error {
    /// Returns true if this error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::TransportFailure(_)
        )
    }
}
