//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod display_port;
mod fetch_port;

#[cfg(test)]
pub use display_port::MockDisplayPort;
pub use display_port::{DeviceInfo, DisplayPort};
#[cfg(test)]
pub use fetch_port::MockResourceFetcher;
pub use fetch_port::ResourceFetcher;
