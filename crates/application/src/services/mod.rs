//! Application services - Polling core and its consumers

pub mod consumer_view;
pub mod integration;
pub mod poller_registry;
pub mod sensors;
pub mod shared_poller;

#[cfg(test)]
pub(crate) mod test_support;

pub use consumer_view::{ConsumerView, project};
pub use integration::{
    DeviceSpec, EntryConfig, EntryId, Monitoring, StopConfig, TransitIntegration, VehicleConfig,
};
pub use poller_registry::PollerRegistry;
pub use sensors::VehicleTracker;
pub use shared_poller::{
    DEFAULT_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS, PollerListener,
    PollerPhase, PollerSettings, PollerUpdate, SharedPoller, WARMUP_INTERVAL_SECS,
};
