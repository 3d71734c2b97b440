//! Application layer - Polling core and orchestration
//!
//! Contains the shared pollers, the registry that deduplicates them per
//! resource key, the per-consumer views projecting their data, and the port
//! definitions the infrastructure layer implements.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
