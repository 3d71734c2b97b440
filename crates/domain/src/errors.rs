//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Invalid resource key (empty operator or target)
    #[error("Invalid resource key: {0}")]
    InvalidResourceKey(String),

    /// Invalid coordinates
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}
