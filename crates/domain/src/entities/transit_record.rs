//! One upstream observation: a stop visit or a vehicle activity

use serde::{Deserialize, Serialize};

use crate::value_objects::GeoLocation;

/// The call (stop passage) a journey is monitored at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoredCall {
    /// Stop identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_point_ref: Option<String>,
    /// Human-readable stop name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_point_name: Option<String>,
    /// Scheduled arrival time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aimed_arrival_time: Option<String>,
    /// Predicted arrival time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_arrival_time: Option<String>,
}

/// A monitored vehicle journey as seen at a stop or on the road
///
/// Read-only once fetched. Every field is optional because the upstream
/// feed omits whatever it does not know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitRecord {
    /// Line reference, e.g. `N` or `38`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_ref: Option<String>,
    /// Direction reference, usually `IB` or `OB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_ref: Option<String>,
    /// Vehicle identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_ref: Option<String>,
    /// Public line name, e.g. `JUDAH`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_line_name: Option<String>,
    /// Transport mode hint, when the operator provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_mode: Option<String>,
    /// Origin of the journey
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_name: Option<String>,
    /// Destination of the journey
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    /// Occupancy, e.g. `seatsAvailable`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<String>,
    /// Heading in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Current vehicle position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    /// Stop passage this record refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitored_call: Option<MonitoredCall>,
    /// When the upstream recorded this observation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at_time: Option<String>,
}

impl TransitRecord {
    /// Stop name from the monitored call
    pub fn stop_name(&self) -> Option<&str> {
        self.monitored_call
            .as_ref()
            .and_then(|call| call.stop_point_name.as_deref())
    }

    /// Expected arrival time, falling back to the aimed one
    pub fn arrival_time(&self) -> Option<&str> {
        let call = self.monitored_call.as_ref()?;
        call.expected_arrival_time
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| call.aimed_arrival_time.as_deref())
            .filter(|t| !t.is_empty())
    }
}
