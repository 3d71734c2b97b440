//! SIRI response envelope and its conversion into domain snapshots
//!
//! The 511 API returns SIRI-flavoured JSON with PascalCase keys. Collections
//! are sometimes a list and sometimes a bare object, and numeric fields are
//! sometimes quoted, so the raw types here are deliberately permissive.

use domain::{GeoLocation, MonitoredCall, ResourceKind, ResourceSnapshot, TransitRecord};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::RATE_LIMIT_SENTENCE;
use crate::error::Transit511Error;

/// Number of body characters kept in error messages
const BODY_EXCERPT_LEN: usize = 100;

/// Decode a raw monitoring response body into a snapshot
///
/// Strips byte-order marks and surrounding whitespace, detects the quota
/// message the API sends in place of JSON, and normalises the envelope for
/// the given resource kind.
pub fn parse_monitoring_response(
    kind: ResourceKind,
    body: &str,
) -> Result<ResourceSnapshot, Transit511Error> {
    let text = sanitize_body(body);

    if text.starts_with(RATE_LIMIT_SENTENCE) {
        return Err(Transit511Error::RateLimited {
            message: text,
            retry_after_secs: None,
        });
    }

    if text.is_empty() {
        return Err(Transit511Error::MalformedResponse(
            "Empty response from API".to_string(),
        ));
    }

    if !text.starts_with('{') && !text.starts_with('[') {
        let excerpt: String = text.chars().take(BODY_EXCERPT_LEN).collect();
        return Err(Transit511Error::MalformedResponse(format!(
            "Invalid JSON response: {excerpt}"
        )));
    }

    let raw: RawResponse = serde_json::from_str(&text)
        .map_err(|e| Transit511Error::MalformedResponse(format!("Failed to parse JSON: {e}")))?;

    Ok(raw.into_snapshot(kind))
}

/// Remove every U+FEFF and trim whitespace
fn sanitize_body(body: &str) -> String {
    body.replace('\u{feff}', "").trim().to_string()
}

// --- Raw API response types for deserialization ---

/// A JSON value that may be a single item or a list of items
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

fn flatten<T>(value: Option<OneOrMany<T>>) -> Vec<T> {
    value.map(OneOrMany::into_vec).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawResponse {
    #[serde(default)]
    service_delivery: Option<RawServiceDelivery>,
}

impl RawResponse {
    fn into_snapshot(self, kind: ResourceKind) -> ResourceSnapshot {
        let Some(delivery) = self.service_delivery else {
            return ResourceSnapshot::default();
        };

        match kind {
            ResourceKind::Stop => {
                let Some(stop) = flatten(delivery.stop_monitoring_delivery).into_iter().next()
                else {
                    return ResourceSnapshot::default();
                };
                let records = flatten(stop.monitored_stop_visit)
                    .into_iter()
                    .map(|visit| {
                        visit
                            .monitored_vehicle_journey
                            .unwrap_or_default()
                            .into_record(visit.recorded_at_time)
                    })
                    .collect();
                ResourceSnapshot::new(stop.response_timestamp, records)
            },
            ResourceKind::Vehicle => {
                let Some(vehicle) = flatten(delivery.vehicle_monitoring_delivery)
                    .into_iter()
                    .next()
                else {
                    return ResourceSnapshot::default();
                };
                let records = flatten(vehicle.vehicle_activity)
                    .into_iter()
                    .map(|activity| {
                        activity
                            .monitored_vehicle_journey
                            .unwrap_or_default()
                            .into_record(activity.recorded_at_time)
                    })
                    .collect();
                ResourceSnapshot::new(vehicle.response_timestamp, records)
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawServiceDelivery {
    #[serde(default)]
    stop_monitoring_delivery: Option<OneOrMany<RawStopDelivery>>,
    #[serde(default)]
    vehicle_monitoring_delivery: Option<OneOrMany<RawVehicleDelivery>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStopDelivery {
    #[serde(default, deserialize_with = "lenient_string")]
    response_timestamp: Option<String>,
    #[serde(default)]
    monitored_stop_visit: Option<OneOrMany<RawStopVisit>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawVehicleDelivery {
    #[serde(default, deserialize_with = "lenient_string")]
    response_timestamp: Option<String>,
    #[serde(default)]
    vehicle_activity: Option<OneOrMany<RawVehicleActivity>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStopVisit {
    #[serde(default, deserialize_with = "lenient_string")]
    recorded_at_time: Option<String>,
    #[serde(default)]
    monitored_vehicle_journey: Option<RawJourney>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawVehicleActivity {
    #[serde(default, deserialize_with = "lenient_string")]
    recorded_at_time: Option<String>,
    #[serde(default)]
    monitored_vehicle_journey: Option<RawJourney>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawJourney {
    #[serde(default, deserialize_with = "lenient_string")]
    line_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    direction_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    vehicle_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    published_line_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    vehicle_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    origin_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    destination_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    occupancy: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    bearing: Option<f64>,
    #[serde(default)]
    vehicle_location: Option<RawLocation>,
    #[serde(default)]
    monitored_call: Option<RawMonitoredCall>,
}

impl RawJourney {
    fn into_record(self, recorded_at_time: Option<String>) -> TransitRecord {
        let location = self.vehicle_location.and_then(|loc| {
            let (lat, lon) = (loc.latitude?, loc.longitude?);
            GeoLocation::new(lat, lon).ok()
        });

        TransitRecord {
            line_ref: self.line_ref,
            direction_ref: self.direction_ref,
            vehicle_ref: self.vehicle_ref,
            published_line_name: self.published_line_name,
            vehicle_mode: self.vehicle_mode,
            origin_name: self.origin_name,
            destination_name: self.destination_name,
            occupancy: self.occupancy,
            bearing: self.bearing,
            location,
            monitored_call: self.monitored_call.map(|call| MonitoredCall {
                stop_point_ref: call.stop_point_ref,
                stop_point_name: call.stop_point_name,
                aimed_arrival_time: call.aimed_arrival_time,
                expected_arrival_time: call.expected_arrival_time,
            }),
            recorded_at_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawLocation {
    #[serde(default, deserialize_with = "lenient_f64")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMonitoredCall {
    #[serde(default, deserialize_with = "lenient_string")]
    stop_point_ref: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    stop_point_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    aimed_arrival_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    expected_arrival_time: Option<String>,
}

/// Accept strings and numbers, anything else becomes `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept numbers and numeric strings, anything unparsable becomes `None`
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
