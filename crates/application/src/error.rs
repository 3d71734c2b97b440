//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Upstream rejected the credential
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// Upstream quota exceeded
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Seconds to wait before retrying, when the upstream said so
        retry_after_secs: Option<u64>,
    },

    /// Upstream answered with something that is not a usable payload
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Network error, timeout or unexpected HTTP status
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A listener with the same subscription id is already registered
    #[error("Duplicate subscription: {0}")]
    DuplicateSubscription(String),

    /// No poller exists for the given key
    #[error("Unknown resource key: {0}")]
    UnknownResourceKey(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::TransportFailure(_)
        )
    }

    /// Whether this error came from a fetch attempt
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthFailure(_)
                | Self::RateLimited { .. }
                | Self::MalformedResponse(_)
                | Self::TransportFailure(_)
        )
    }
}
