//! Domain entities - fetched records and the snapshots that hold them

mod snapshot;
mod transit_record;

pub use snapshot::{FilteredSnapshot, ResourceSnapshot};
pub use transit_record::{MonitoredCall, TransitRecord};
