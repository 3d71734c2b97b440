//! Device identity derivation
//!
//! Human-readable device labels built from the first record a consumer
//! sees. Derived once per device; afterwards the label is left alone.

use std::collections::BTreeSet;

use crate::entities::TransitRecord;
use crate::value_objects::LineFilter;
use crate::vehicle_type::{VehicleType, classify};

/// Label fields extracted from a device's first non-empty data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Display label for the device
    pub label: String,
    /// Stop name, for stop devices
    pub stop_name: Option<String>,
    /// Line reference of the first record
    pub line_ref: String,
    /// Published line name of the first record
    pub line_name: String,
    /// Classified vehicle type
    pub vehicle_type: VehicleType,
    /// Direction references seen across the records
    pub directions: BTreeSet<String>,
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest
///
/// `"JUDAH"` becomes `"Judah"`, `"38R-GEARY"` becomes `"38R-Geary"`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// `" IB/OB"`, `" IB"`, `" OB"` or empty, from the directions present
pub fn direction_suffix(directions: &BTreeSet<String>) -> &'static str {
    match (directions.contains("IB"), directions.contains("OB")) {
        (true, true) => " IB/OB",
        (true, false) => " IB",
        (false, true) => " OB",
        (false, false) => "",
    }
}

fn collect_directions(records: &[TransitRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|r| r.direction_ref.clone())
        .filter(|d| !d.is_empty())
        .collect()
}

fn line_fields(operator: &str, first: &TransitRecord) -> (String, String, VehicleType) {
    let line_ref = first.line_ref.clone().unwrap_or_default();
    let line_name = first
        .published_line_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| line_ref.clone());
    let vehicle_type = classify(operator, &line_ref, first.vehicle_mode.as_deref());
    (line_ref, line_name, vehicle_type)
}

/// Derive the identity of a stop device from its filtered records
///
/// Returns `None` when there are no records yet. With a line filter the
/// label reads `"N Judah Train - Church St IB"`, without one just the stop
/// name and direction suffix.
pub fn derive_stop_identity(
    operator: &str,
    stop_code: &str,
    filter: &LineFilter,
    records: &[TransitRecord],
) -> Option<DeviceIdentity> {
    let first = records.first()?;
    let stop_name = first.stop_name().unwrap_or(stop_code).to_string();
    let (line_ref, line_name, vehicle_type) = line_fields(operator, first);
    let directions = collect_directions(records);
    let suffix = direction_suffix(&directions);

    let label = if filter.line_ref().is_some() {
        format!(
            "{line_ref} {} {} - {stop_name}{suffix}",
            title_case(&line_name),
            vehicle_type.label_word()
        )
    } else {
        format!("{stop_name}{suffix}")
    };

    Some(DeviceIdentity {
        label,
        stop_name: Some(stop_name),
        line_ref,
        line_name,
        vehicle_type,
        directions,
    })
}

/// Derive the identity of a vehicle device from its records
pub fn derive_vehicle_identity(
    operator: &str,
    vehicle_id: &str,
    records: &[TransitRecord],
) -> Option<DeviceIdentity> {
    let first = records.first()?;
    let (line_ref, line_name, vehicle_type) = line_fields(operator, first);

    let label = format!(
        "{line_ref} {} {} - Vehicle {vehicle_id}",
        title_case(&line_name),
        vehicle_type.label_word()
    );

    Some(DeviceIdentity {
        label,
        stop_name: None,
        line_ref,
        line_name,
        vehicle_type,
        directions: collect_directions(records),
    })
}

/// Device name used before any data arrived
pub fn initial_stop_device_name(stop_name: &str, line: Option<&str>) -> String {
    match line.filter(|l| !l.is_empty()) {
        Some(line) => format!("{stop_name} - Line {line}"),
        None => stop_name.to_string(),
    }
}

/// Vehicle device name used before any data arrived
pub fn initial_vehicle_device_name(vehicle_id: &str) -> String {
    format!("Vehicle {vehicle_id}")
}
