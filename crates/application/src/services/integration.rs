//! Configuration entries
//!
//! A [`TransitIntegration`] turns user configuration entries into views on
//! shared pollers. Each entry monitors either a list of stops or a list of
//! vehicles for one operator; unloading an entry only releases the pollers
//! that entry acquired.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use domain::{
    LineFilter, ResourceKey, initial_stop_device_name, initial_vehicle_device_name,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ApplicationError;
use crate::ports::{DeviceInfo, DisplayPort};
use crate::services::consumer_view::ConsumerView;
use crate::services::poller_registry::PollerRegistry;
use crate::services::shared_poller::{
    DEFAULT_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL_SECS, PollerSettings,
};

/// Identifier of a loaded configuration entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One monitored stop, optionally narrowed to a line and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopConfig {
    pub stop_code: String,
    #[serde(default)]
    pub line_id: Option<String>,
    /// `IB` or `OB`
    #[serde(default)]
    pub direction: Option<String>,
    /// Name shown until the real stop name is known
    #[serde(default)]
    pub stop_name: Option<String>,
}

impl StopConfig {
    pub fn new(stop_code: impl Into<String>) -> Self {
        Self {
            stop_code: stop_code.into(),
            line_id: None,
            direction: None,
            stop_name: None,
        }
    }

    #[must_use]
    pub fn with_line(mut self, line_id: impl Into<String>) -> Self {
        self.line_id = Some(line_id.into());
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    fn filter(&self) -> LineFilter {
        LineFilter::from_parts(self.line_id.clone(), self.direction.clone())
    }
}

/// One tracked vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub vehicle_id: String,
}

/// What an entry monitors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Monitoring {
    Stops(Vec<StopConfig>),
    Vehicles(Vec<VehicleConfig>),
}

/// A user configuration entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Operator code, e.g. `SF`
    pub operator: String,
    /// Operator display name, defaults to the code
    #[serde(default)]
    pub operator_name: Option<String>,
    pub monitoring: Monitoring,
    /// Poll interval in seconds, clamped to [30, 300]
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Log poller creation and reuse at info level
    #[serde(default)]
    pub enable_api_logging: bool,
}

const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl EntryConfig {
    /// Entry monitoring the given stops
    pub fn stops(operator: impl Into<String>, stops: Vec<StopConfig>) -> Self {
        Self {
            operator: operator.into(),
            operator_name: None,
            monitoring: Monitoring::Stops(stops),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            enable_api_logging: false,
        }
    }

    /// Entry tracking the given vehicles
    pub fn vehicles(operator: impl Into<String>, vehicle_ids: &[&str]) -> Self {
        Self {
            operator: operator.into(),
            operator_name: None,
            monitoring: Monitoring::Vehicles(
                vehicle_ids
                    .iter()
                    .map(|id| VehicleConfig {
                        vehicle_id: (*id).to_string(),
                    })
                    .collect(),
            ),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            enable_api_logging: false,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Operator display name, falling back to the code
    pub fn display_operator(&self) -> &str {
        self.operator_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.operator)
    }

    /// Validate the entry
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.operator.trim().is_empty() {
            return Err(ApplicationError::Configuration(
                "operator must not be empty".to_string(),
            ));
        }

        let empty_target = match &self.monitoring {
            Monitoring::Stops(stops) if stops.is_empty() => Some("at least one stop is required"),
            Monitoring::Vehicles(vehicles) if vehicles.is_empty() => {
                Some("at least one vehicle is required")
            },
            Monitoring::Stops(stops) if stops.iter().any(|s| s.stop_code.trim().is_empty()) => {
                Some("stop_code must not be empty")
            },
            Monitoring::Vehicles(vehicles)
                if vehicles.iter().any(|v| v.vehicle_id.trim().is_empty()) =>
            {
                Some("vehicle_id must not be empty")
            },
            _ => None,
        };
        if let Some(message) = empty_target {
            return Err(ApplicationError::Configuration(message.to_string()));
        }

        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.poll_interval_secs) {
            warn!(
                operator = %self.operator,
                poll_interval_secs = self.poll_interval_secs,
                min_secs = MIN_POLL_INTERVAL_SECS,
                max_secs = MAX_POLL_INTERVAL_SECS,
                "Poll interval out of range, will be clamped"
            );
        }

        Ok(())
    }

    /// Devices this entry creates, in configuration order
    pub fn devices(&self) -> Result<Vec<DeviceSpec>, ApplicationError> {
        let operator = self.operator.trim().to_uppercase();
        let manufacturer = self.display_operator().to_string();

        match &self.monitoring {
            Monitoring::Stops(stops) => stops
                .iter()
                .map(|stop| -> Result<DeviceSpec, ApplicationError> {
                    let key = ResourceKey::stop(&operator, &stop.stop_code)?;
                    let filter = stop.filter();
                    let stop_name = stop
                        .stop_name
                        .clone()
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| key.target().to_string());
                    Ok(DeviceSpec {
                        info: DeviceInfo {
                            device_id: stop_device_id(&key, &filter),
                            name: initial_stop_device_name(&stop_name, filter.line_ref()),
                            manufacturer: manufacturer.clone(),
                            model: format!("Stop {}", key.target()),
                            key: key.clone(),
                        },
                        key,
                        filter,
                    })
                })
                .collect(),
            Monitoring::Vehicles(vehicles) => vehicles
                .iter()
                .map(|vehicle| -> Result<DeviceSpec, ApplicationError> {
                    let key = ResourceKey::vehicle(&operator, &vehicle.vehicle_id)?;
                    Ok(DeviceSpec {
                        info: DeviceInfo {
                            device_id: key.to_string(),
                            name: initial_vehicle_device_name(key.target()),
                            manufacturer: manufacturer.clone(),
                            model: format!("Vehicle {}", key.target()),
                            key: key.clone(),
                        },
                        key,
                        filter: LineFilter::all(),
                    })
                })
                .collect(),
        }
    }
}

/// `{OP}_{stop}`, plus `_{line}` and `_{direction}` when filtered
fn stop_device_id(key: &ResourceKey, filter: &LineFilter) -> String {
    let mut id = key.to_string();
    if let Some(line) = filter.line_ref() {
        id.push('_');
        id.push_str(line);
    }
    if let Some(direction) = filter.direction_ref() {
        id.push('_');
        id.push_str(direction);
    }
    id
}

/// A device an entry will create
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub info: DeviceInfo,
    pub key: ResourceKey,
    pub filter: LineFilter,
}

struct LoadedEntry {
    config: EntryConfig,
    views: Vec<Arc<ConsumerView>>,
}

/// Manages configuration entries on top of a [`PollerRegistry`]
pub struct TransitIntegration {
    registry: Arc<PollerRegistry>,
    display: Arc<dyn DisplayPort>,
    entries: Mutex<HashMap<EntryId, LoadedEntry>>,
}

impl fmt::Debug for TransitIntegration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitIntegration")
            .field("registry", &self.registry)
            .field("entries", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl TransitIntegration {
    pub fn new(registry: Arc<PollerRegistry>, display: Arc<dyn DisplayPort>) -> Self {
        Self {
            registry,
            display,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Load an entry: acquire a poller and attach a view per device
    ///
    /// A device id already shown by a loaded entry is rejected before
    /// anything is fetched. On a later failure every poller acquired so far
    /// is released again and the devices announced so far are withdrawn.
    pub async fn setup_entry(&self, config: EntryConfig) -> Result<EntryId, ApplicationError> {
        config.validate()?;
        let devices = config.devices()?;

        let mut seen = HashSet::new();
        if let Some(dup) = devices.iter().find(|d| !seen.insert(d.info.device_id.as_str())) {
            return Err(ApplicationError::DuplicateSubscription(
                dup.info.device_id.clone(),
            ));
        }
        if let Some(dup) = self.owned_device(&devices) {
            return Err(ApplicationError::DuplicateSubscription(dup));
        }

        let settings = PollerSettings::with_interval_secs(config.poll_interval_secs);
        let mut views: Vec<Arc<ConsumerView>> = Vec::with_capacity(devices.len());

        for device in devices {
            let reused = self.registry.contains(&device.key);
            let poller = self.registry.get_or_create(&device.key, settings).await;

            if config.enable_api_logging {
                if reused {
                    info!(key = %device.key, "Reusing existing poller, no new API calls");
                } else {
                    info!(
                        key = %device.key,
                        interval_secs = settings.interval().as_secs(),
                        "Created new poller"
                    );
                }
            }

            self.display.register_device(&device.info);

            match ConsumerView::attach(
                device.info.device_id.clone(),
                poller,
                device.filter,
                Arc::clone(&self.display),
            ) {
                Ok(view) => views.push(view),
                Err(e) => {
                    warn!(device_id = %device.info.device_id, error = %e, "Attaching view failed");
                    self.registry.release(&device.key);
                    // a duplicate belongs to an entry set up concurrently
                    if !matches!(e, ApplicationError::DuplicateSubscription(_)) {
                        self.display.remove_device(&device.info.device_id);
                    }
                    self.release_views(&views);
                    return Err(e);
                },
            }
        }

        let id = EntryId::new();
        info!(
            entry = %id,
            operator = %config.operator,
            devices = views.len(),
            "Entry set up"
        );
        self.entries
            .lock()
            .insert(id, LoadedEntry { config, views });
        Ok(id)
    }

    /// Unload an entry, detaching its views and releasing its pollers
    ///
    /// Returns `false` for an unknown id.
    pub fn unload_entry(&self, id: EntryId) -> bool {
        let Some(entry) = self.entries.lock().remove(&id) else {
            debug!(entry = %id, "Unload ignored, unknown entry");
            return false;
        };

        self.release_views(&entry.views);
        info!(entry = %id, operator = %entry.config.operator, "Entry unloaded");
        true
    }

    fn release_views(&self, views: &[Arc<ConsumerView>]) {
        for view in views {
            view.detach();
            self.registry.release(view.key());
            self.display.remove_device(view.device_id());
        }
    }

    /// First device id already shown by a loaded entry
    fn owned_device(&self, devices: &[DeviceSpec]) -> Option<String> {
        let entries = self.entries.lock();
        devices
            .iter()
            .map(|device| &device.info.device_id)
            .find(|id| {
                entries
                    .values()
                    .flat_map(|entry| &entry.views)
                    .any(|view| view.device_id() == id.as_str())
            })
            .cloned()
    }

    /// Views of an entry, empty for an unknown id
    pub fn views(&self, id: EntryId) -> Vec<Arc<ConsumerView>> {
        self.entries
            .lock()
            .get(&id)
            .map(|entry| entry.views.clone())
            .unwrap_or_default()
    }

    /// Configuration of a loaded entry
    pub fn entry_config(&self, id: EntryId) -> Option<EntryConfig> {
        self.entries
            .lock()
            .get(&id)
            .map(|entry| entry.config.clone())
    }

    pub fn entry_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self.entries.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn registry(&self) -> &Arc<PollerRegistry> {
        &self.registry
    }

    /// Unload every entry and stop all pollers
    pub fn shutdown(&self) {
        let drained: Vec<LoadedEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            self.release_views(&entry.views);
        }
        self.registry.shutdown();
    }
}
