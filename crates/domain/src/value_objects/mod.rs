//! Value Objects - Immutable, identity-less domain primitives

mod geo_location;
mod line_filter;
mod resource_key;

pub use geo_location::GeoLocation;
pub use line_filter::LineFilter;
pub use resource_key::{ResourceKey, ResourceKind};
