//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: the 511 fetcher and a
//! display that renders device state into the log. Also owns configuration
//! loading and logging setup.

pub mod adapters;
pub mod config;
pub mod telemetry;

pub use adapters::*;
pub use config::{ApiConfig, AppConfig};
pub use telemetry::{TelemetryConfig, TelemetryError, init_telemetry};
