//! Display adapter that renders device state into the log
//!
//! Stands in for a home-automation host. Devices are announced, renamed,
//! updated and withdrawn through [`DisplayPort`], and every change is logged
//! with the sensor read-outs a host would show: arrivals for stops, position
//! for tracked vehicles. The latest state per device is kept for inspection.

use std::collections::BTreeMap;

use application::ports::{DeviceInfo, DisplayPort};
use application::services::sensors;
use chrono::{DateTime, Utc};
use domain::{FilteredSnapshot, ResourceKind};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Latest known state of one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub info: DeviceInfo,
    /// Current display name, the label once identity is known
    pub name: String,
    pub snapshot: FilteredSnapshot,
    pub last_success: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// [`DisplayPort`] writing to `tracing`
#[derive(Debug, Default)]
pub struct TracingDisplay {
    devices: Mutex<BTreeMap<String, DeviceState>>,
}

impl TracingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of one device
    pub fn device(&self, device_id: &str) -> Option<DeviceState> {
        self.devices.lock().get(device_id).cloned()
    }

    /// All devices, ordered by id
    pub fn devices(&self) -> Vec<DeviceState> {
        self.devices.lock().values().cloned().collect()
    }

    /// One summary line per device
    pub fn summary(&self, now: DateTime<Utc>) -> Vec<String> {
        self.devices
            .lock()
            .values()
            .map(|state| {
                let api = if sensors::api_ok(&state.snapshot, state.last_success) {
                    "ok"
                } else {
                    "down"
                };
                format!(
                    "{} [{}]: {}, api {api}",
                    state.name,
                    state.info.device_id,
                    readout(state, now),
                )
            })
            .collect()
    }
}

fn readout(state: &DeviceState, now: DateTime<Utc>) -> String {
    let snapshot = &state.snapshot;
    match state.info.key.kind() {
        ResourceKind::Stop => {
            let directions = sensors::directions(snapshot);
            let mut out = format!(
                "{} arrivals, next in {}",
                sensors::count(snapshot, None),
                sensors::next_three(snapshot, None, now)
            );
            if !directions.is_empty() {
                out.push_str(&format!(", directions {}", directions.join("/")));
            }
            out
        },
        ResourceKind::Vehicle => {
            let tracker =
                sensors::VehicleTracker::new(snapshot, state.info.key.target(), state.last_success);
            match tracker.position() {
                Some(position) if tracker.is_available() => {
                    let mut out =
                        format!("at {:.5}, {:.5}", position.latitude(), position.longitude());
                    if let Some(bearing) = tracker.bearing() {
                        out.push_str(&format!(" heading {bearing:.0}"));
                    }
                    out
                },
                Some(_) => "position stale".to_string(),
                None => "position unknown".to_string(),
            }
        },
    }
}

impl DisplayPort for TracingDisplay {
    fn register_device(&self, device: &DeviceInfo) {
        info!(
            device_id = %device.device_id,
            name = %device.name,
            manufacturer = %device.manufacturer,
            model = %device.model,
            "Device registered"
        );
        self.devices.lock().insert(
            device.device_id.clone(),
            DeviceState {
                info: device.clone(),
                name: device.name.clone(),
                snapshot: FilteredSnapshot::empty(),
                last_success: false,
                updated_at: None,
            },
        );
    }

    fn rename_device(&self, device_id: &str, label: &str) {
        let mut devices = self.devices.lock();
        let Some(state) = devices.get_mut(device_id) else {
            warn!(device_id, "Rename for unregistered device ignored");
            return;
        };
        info!(device_id, from = %state.name, to = label, "Device renamed");
        state.name = label.to_string();
    }

    fn publish_state(&self, device_id: &str, snapshot: &FilteredSnapshot, last_success: bool) {
        let now = Utc::now();
        let mut devices = self.devices.lock();
        let Some(state) = devices.get_mut(device_id) else {
            warn!(device_id, "State for unregistered device ignored");
            return;
        };

        match state.info.key.kind() {
            ResourceKind::Stop => info!(
                device_id,
                name = %state.name,
                count = sensors::count(snapshot, None),
                next_minutes = ?sensors::next_arrival_minutes(snapshot, None, now),
                next_three = %sensors::next_three(snapshot, None, now),
                next_vehicle = sensors::next_vehicle(snapshot, None).unwrap_or("-"),
                destination = sensors::next_destination(snapshot).unwrap_or("-"),
                directions = ?sensors::directions(snapshot),
                api_ok = sensors::api_ok(snapshot, last_success),
                "State updated"
            ),
            ResourceKind::Vehicle => {
                let tracker =
                    sensors::VehicleTracker::new(snapshot, state.info.key.target(), last_success);
                let position = tracker.position();
                info!(
                    device_id,
                    name = %state.name,
                    available = tracker.is_available(),
                    latitude = position.map(|p| p.latitude()),
                    longitude = position.map(|p| p.longitude()),
                    bearing = tracker.bearing(),
                    destination = sensors::next_destination(snapshot).unwrap_or("-"),
                    api_ok = sensors::api_ok(snapshot, last_success),
                    "State updated"
                );
            },
        }

        state.snapshot = snapshot.clone();
        state.last_success = last_success;
        state.updated_at = Some(now);
    }

    fn remove_device(&self, device_id: &str) {
        if self.devices.lock().remove(device_id).is_some() {
            info!(device_id, "Device removed");
        } else {
            debug!(device_id, "Removal of unknown device ignored");
        }
    }
}
