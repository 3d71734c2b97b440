//! Line/direction filter applied by consumer views

use serde::{Deserialize, Serialize};

use crate::entities::TransitRecord;

/// Filter selecting the records one consumer cares about
///
/// Unset fields match everything, so the default filter passes all records.
/// Empty strings are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineFilter {
    line: Option<String>,
    direction: Option<String>,
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl LineFilter {
    /// A filter that passes every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on a line reference
    pub fn line(line: impl Into<String>) -> Self {
        Self {
            line: normalize(Some(line.into())),
            direction: None,
        }
    }

    /// Build from optional configuration values
    pub fn from_parts(line: Option<String>, direction: Option<String>) -> Self {
        Self {
            line: normalize(line),
            direction: normalize(direction),
        }
    }

    /// Restrict additionally to one direction (`IB`/`OB`)
    #[must_use]
    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = normalize(Some(direction.into()));
        self
    }

    /// Configured line reference, if any
    pub fn line_ref(&self) -> Option<&str> {
        self.line.as_deref()
    }

    /// Configured direction reference, if any
    pub fn direction_ref(&self) -> Option<&str> {
        self.direction.as_deref()
    }

    /// True when the filter passes every record
    pub const fn is_unfiltered(&self) -> bool {
        self.line.is_none() && self.direction.is_none()
    }

    /// Whether a record passes this filter
    pub fn matches(&self, record: &TransitRecord) -> bool {
        let line_ok = self
            .line
            .as_deref()
            .is_none_or(|line| record.line_ref.as_deref() == Some(line));
        let direction_ok = self
            .direction
            .as_deref()
            .is_none_or(|dir| record.direction_ref.as_deref() == Some(dir));
        line_ok && direction_ok
    }
}
