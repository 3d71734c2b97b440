//! Resource key value object
//!
//! Identifies one upstream subscription: an operator plus either a stop code
//! or a vehicle id. At most one shared poller exists per key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// What kind of upstream resource a key points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A stop, polled via StopMonitoring
    Stop,
    /// A single vehicle, polled via VehicleMonitoring
    Vehicle,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Vehicle => write!(f, "vehicle"),
        }
    }
}

/// `(operator, target)` pair uniquely identifying one upstream resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    operator: String,
    kind: ResourceKind,
    target: String,
}

impl ResourceKey {
    /// Create a new key
    ///
    /// The operator is trimmed and upper-cased, the target is trimmed.
    /// Both must be non-empty.
    pub fn new(
        operator: impl Into<String>,
        kind: ResourceKind,
        target: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let operator = operator.into().trim().to_uppercase();
        let target = target.into().trim().to_string();

        if operator.is_empty() {
            return Err(DomainError::InvalidResourceKey(
                "operator must not be empty".to_string(),
            ));
        }
        if target.is_empty() {
            return Err(DomainError::InvalidResourceKey(format!(
                "{kind} target must not be empty"
            )));
        }

        Ok(Self {
            operator,
            kind,
            target,
        })
    }

    /// Key for a stop monitored by `operator`
    pub fn stop(
        operator: impl Into<String>,
        stop_code: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::new(operator, ResourceKind::Stop, stop_code)
    }

    /// Key for a vehicle operated by `operator`
    pub fn vehicle(
        operator: impl Into<String>,
        vehicle_id: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::new(operator, ResourceKind::Vehicle, vehicle_id)
    }

    /// Operator (agency) code, e.g. `SF`
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Resource kind
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Stop code or vehicle id
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether this key points at a stop
    pub const fn is_stop(&self) -> bool {
        matches!(self.kind, ResourceKind::Stop)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResourceKind::Stop => write!(f, "{}_{}", self.operator, self.target),
            ResourceKind::Vehicle => write!(f, "{}_vehicle_{}", self.operator, self.target),
        }
    }
}
