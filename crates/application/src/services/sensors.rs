//! Sensor projections
//!
//! Pure read-outs over a view's [`FilteredSnapshot`]: counts, arrival
//! times and the vehicle tracker position. Direction-scoped variants take an
//! optional `IB`/`OB` direction; `None` means all records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use domain::{FilteredSnapshot, GeoLocation, TransitRecord};

/// Placeholder for an empty next-three list
pub const NO_ARRIVALS: &str = "none";

fn in_direction<'a>(
    snapshot: &'a FilteredSnapshot,
    direction: Option<&'a str>,
) -> impl Iterator<Item = &'a TransitRecord> + 'a {
    snapshot.records.iter().filter(move |record| {
        direction.is_none_or(|wanted| record.direction_ref.as_deref() == Some(wanted))
    })
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn minutes_until(arrival: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (arrival - now).num_milliseconds() as f64 / 1000.0;
    (seconds / 60.0).round() as i64
}

/// Rounded minutes from `now` until a record's arrival
pub fn minutes_to_arrival(record: &TransitRecord, now: DateTime<Utc>) -> Option<i64> {
    record
        .arrival_time()
        .and_then(parse_time)
        .map(|arrival| minutes_until(arrival, now))
}

/// Number of records
pub fn count(snapshot: &FilteredSnapshot, direction: Option<&str>) -> usize {
    in_direction(snapshot, direction).count()
}

/// Response timestamp of the upstream data
pub fn api_timestamp(snapshot: &FilteredSnapshot) -> Option<DateTime<Utc>> {
    snapshot.timestamp.as_deref().and_then(parse_time)
}

/// Arrival time of the first record
pub fn next_arrival_time(
    snapshot: &FilteredSnapshot,
    direction: Option<&str>,
) -> Option<DateTime<Utc>> {
    in_direction(snapshot, direction)
        .next()
        .and_then(TransitRecord::arrival_time)
        .and_then(parse_time)
}

/// Minutes until the first arrival, rounded
pub fn next_arrival_minutes(
    snapshot: &FilteredSnapshot,
    direction: Option<&str>,
    now: DateTime<Utc>,
) -> Option<i64> {
    next_arrival_time(snapshot, direction).map(|arrival| minutes_until(arrival, now))
}

/// Vehicle reference of the first record
pub fn next_vehicle<'a>(snapshot: &'a FilteredSnapshot, direction: Option<&'a str>) -> Option<&'a str> {
    in_direction(snapshot, direction)
        .next()
        .and_then(|r| r.vehicle_ref.as_deref())
}

pub fn next_destination(snapshot: &FilteredSnapshot) -> Option<&str> {
    snapshot
        .first()
        .and_then(|r| r.destination_name.as_deref())
}

pub fn next_occupancy(snapshot: &FilteredSnapshot) -> Option<&str> {
    snapshot.first().and_then(|r| r.occupancy.as_deref())
}

/// Rounded minutes of the first three arrivals, comma separated
///
/// Records without a parsable arrival time are skipped. Returns `"none"`
/// when nothing remains.
pub fn next_three(snapshot: &FilteredSnapshot, direction: Option<&str>, now: DateTime<Utc>) -> String {
    let minutes: Vec<String> = in_direction(snapshot, direction)
        .take(3)
        .filter_map(|r| minutes_to_arrival(r, now))
        .map(|minutes| minutes.to_string())
        .collect();

    if minutes.is_empty() {
        NO_ARRIVALS.to_string()
    } else {
        minutes.join(", ")
    }
}

/// Direction references present, sorted and de-duplicated
pub fn directions(snapshot: &FilteredSnapshot) -> Vec<String> {
    snapshot
        .records
        .iter()
        .filter_map(|r| r.direction_ref.clone())
        .filter(|d| !d.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Whether the feed looks healthy: data present or the last fetch worked
pub fn api_ok(snapshot: &FilteredSnapshot, last_success: bool) -> bool {
    !snapshot.records.is_empty() || last_success
}

/// Position read-out for a tracked vehicle
#[derive(Debug, Clone, Copy)]
pub struct VehicleTracker<'a> {
    snapshot: &'a FilteredSnapshot,
    vehicle_id: &'a str,
    last_success: bool,
}

impl<'a> VehicleTracker<'a> {
    pub const fn new(snapshot: &'a FilteredSnapshot, vehicle_id: &'a str, last_success: bool) -> Self {
        Self {
            snapshot,
            vehicle_id,
            last_success,
        }
    }

    /// The record for this vehicle, falling back to the first one
    pub fn record(&self) -> Option<&'a TransitRecord> {
        self.snapshot
            .records
            .iter()
            .find(|r| r.vehicle_ref.as_deref() == Some(self.vehicle_id))
            .or_else(|| self.snapshot.first())
    }

    pub fn position(&self) -> Option<GeoLocation> {
        self.record().and_then(|r| r.location)
    }

    pub fn bearing(&self) -> Option<f64> {
        self.record().and_then(|r| r.bearing)
    }

    /// Available only after a successful fetch that carried a position
    pub fn is_available(&self) -> bool {
        self.last_success && self.position().is_some()
    }
}
