//! Infrastructure adapters
//!
//! Adapters connect application ports to concrete implementations.

mod tracing_display;
mod transit511_adapter;

pub use tracing_display::{DeviceState, TracingDisplay};
pub use transit511_adapter::Transit511Adapter;
