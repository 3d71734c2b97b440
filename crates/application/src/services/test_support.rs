//! Shared fakes for service tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{MonitoredCall, ResourceKey, ResourceSnapshot, TransitRecord};
use parking_lot::Mutex;

use crate::error::ApplicationError;
use crate::ports::{DeviceInfo, DisplayPort, ResourceFetcher};

/// Fetcher replaying a script, then repeating a fallback snapshot
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<ResourceSnapshot, ApplicationError>>>,
    fallback: ResourceSnapshot,
    delay: Option<Duration>,
    calls: AtomicUsize,
    keys: Mutex<Vec<ResourceKey>>,
}

impl ScriptedFetcher {
    pub fn always(snapshot: ResourceSnapshot) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: snapshot,
            delay: None,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        })
    }

    /// Replays `script`; afterwards repeats the first successful entry
    pub fn scripted(script: Vec<Result<ResourceSnapshot, ApplicationError>>) -> Arc<Self> {
        let fallback = script
            .iter()
            .find_map(|r| r.as_ref().ok().cloned())
            .unwrap_or_else(|| snapshot_with_lines(&["N"]));
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        })
    }

    /// Every fetch first sleeps `delay`
    pub fn slow(snapshot: ResourceSnapshot, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: snapshot,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, key: &ResourceKey) -> usize {
        self.keys.lock().iter().filter(|k| *k == key).count()
    }
}

#[async_trait]
impl ResourceFetcher for ScriptedFetcher {
    async fn fetch(&self, key: &ResourceKey) -> Result<ResourceSnapshot, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys.lock().push(key.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Display fake recording every call
#[derive(Default)]
pub struct RecordingDisplay {
    pub registered: Mutex<Vec<DeviceInfo>>,
    pub renames: Mutex<Vec<(String, String)>>,
    pub published: Mutex<Vec<(String, usize, bool)>>,
    pub removed: Mutex<Vec<String>>,
}

impl RecordingDisplay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn renames_for(&self, device_id: &str) -> Vec<String> {
        self.renames
            .lock()
            .iter()
            .filter(|(id, _)| id == device_id)
            .map(|(_, label)| label.clone())
            .collect()
    }
}

impl DisplayPort for RecordingDisplay {
    fn register_device(&self, device: &DeviceInfo) {
        self.registered.lock().push(device.clone());
    }

    fn rename_device(&self, device_id: &str, label: &str) {
        self.renames
            .lock()
            .push((device_id.to_string(), label.to_string()));
    }

    fn publish_state(
        &self,
        device_id: &str,
        snapshot: &domain::FilteredSnapshot,
        last_success: bool,
    ) {
        self.published
            .lock()
            .push((device_id.to_string(), snapshot.len(), last_success));
    }

    fn remove_device(&self, device_id: &str) {
        self.removed.lock().push(device_id.to_string());
    }
}

/// A stop visit on `line` at Duboce Ave & Church St
pub fn visit(line: &str, direction: &str) -> TransitRecord {
    TransitRecord {
        line_ref: Some(line.to_string()),
        direction_ref: Some(direction.to_string()),
        published_line_name: Some(match line {
            "N" => "JUDAH".to_string(),
            "T" => "THIRD STREET".to_string(),
            other => other.to_string(),
        }),
        vehicle_ref: Some(format!("{line}-100")),
        monitored_call: Some(MonitoredCall {
            stop_point_ref: Some("18031".to_string()),
            stop_point_name: Some("Duboce Ave & Church St".to_string()),
            ..MonitoredCall::default()
        }),
        ..TransitRecord::default()
    }
}

/// Snapshot with one inbound visit per line, in order
pub fn snapshot_with_lines(lines: &[&str]) -> ResourceSnapshot {
    ResourceSnapshot::new(
        Some("2026-10-16T08:00:00Z".to_string()),
        lines.iter().map(|l| visit(l, "IB")).collect(),
    )
}
