//! Cached fetch results

use serde::{Deserialize, Serialize};

use super::TransitRecord;

/// Latest successfully fetched state of one resource
///
/// Owned by exactly one shared poller. Replaced wholesale on each successful
/// fetch and left untouched when a fetch fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Upstream `ResponseTimestamp`
    pub timestamp: Option<String>,
    /// Records in upstream order
    pub records: Vec<TransitRecord>,
}

impl ResourceSnapshot {
    /// Create a snapshot
    pub fn new(timestamp: Option<String>, records: Vec<TransitRecord>) -> Self {
        Self { timestamp, records }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A consumer's view of a snapshot after its filter was applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredSnapshot {
    /// Timestamp of the snapshot this was projected from
    pub timestamp: Option<String>,
    /// Matching records, original order preserved
    pub records: Vec<TransitRecord>,
}

impl FilteredSnapshot {
    /// No timestamp, no records
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record matched
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First (soonest) record
    pub fn first(&self) -> Option<&TransitRecord> {
        self.records.first()
    }
}
