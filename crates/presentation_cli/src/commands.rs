//! Output formatting for the one-shot commands

use application::EntryConfig;
use application::error::ApplicationError;
use application::services::sensors;
use chrono::{DateTime, Utc};
use domain::{
    FilteredSnapshot, LineFilter, ResourceKey, TransitRecord, classify, derive_stop_identity,
    derive_vehicle_identity,
};

/// One line per upcoming arrival
pub fn arrival_line(record: &TransitRecord, now: DateTime<Utc>) -> String {
    let line = record.line_ref.as_deref().unwrap_or("?");
    let destination = record.destination_name.as_deref().unwrap_or("unknown destination");
    let direction = record.direction_ref.as_deref().unwrap_or("-");

    let mut out = format!("{line} to {destination} ({direction})");
    match sensors::minutes_to_arrival(record, now) {
        Some(minutes) if minutes <= 0 => out.push_str(", arriving"),
        Some(minutes) => out.push_str(&format!(", in {minutes} min")),
        None => out.push_str(", no arrival time"),
    }
    if let Some(vehicle) = record.vehicle_ref.as_deref() {
        out.push_str(&format!(", vehicle {vehicle}"));
    }
    out
}

/// Label a host would give this resource after seeing `snapshot`
pub fn device_label(key: &ResourceKey, filter: &LineFilter, snapshot: &FilteredSnapshot) -> String {
    let identity = if key.is_stop() {
        derive_stop_identity(key.operator(), key.target(), filter, &snapshot.records)
    } else {
        derive_vehicle_identity(key.operator(), key.target(), &snapshot.records)
    };

    identity.map_or_else(|| format!("{key} (no data)"), |identity| identity.label)
}

/// Human-readable fetch result
pub fn render_fetch(
    key: &ResourceKey,
    filter: &LineFilter,
    snapshot: &FilteredSnapshot,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut lines = vec![device_label(key, filter, snapshot)];

    if let Some(timestamp) = sensors::api_timestamp(snapshot) {
        lines.push(format!("  as of {}", timestamp.to_rfc3339()));
    }

    if snapshot.is_empty() {
        lines.push("  no records".to_string());
        return lines;
    }

    lines.extend(
        snapshot
            .records
            .iter()
            .map(|record| format!("  {}", arrival_line(record, now))),
    );

    if !key.is_stop() {
        let tracker = sensors::VehicleTracker::new(snapshot, key.target(), true);
        if let Some(position) = tracker.position() {
            lines.push(format!(
                "  position {:.5}, {:.5}",
                position.latitude(),
                position.longitude()
            ));
        }
    }

    lines
}

pub fn render_classify(operator: &str, line: &str, mode: Option<&str>) -> String {
    let vehicle_type = classify(operator, line, mode);
    format!(
        "{operator} {line}: {vehicle_type} ({}, {})",
        vehicle_type.label_word(),
        vehicle_type.icon()
    )
}

/// Devices an entry would create, without contacting the API
pub fn render_devices(entry: &EntryConfig) -> Result<Vec<String>, ApplicationError> {
    let mut lines = vec![format!(
        "{} (poll every {}s)",
        entry.display_operator(),
        entry.poll_interval_secs
    )];

    for device in entry.devices()? {
        lines.push(format!(
            "  {} -> {} [{}]",
            device.info.device_id, device.info.name, device.key
        ));
    }

    Ok(lines)
}
