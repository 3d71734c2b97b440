//! Domain layer for the 511 transit integration
//!
//! Contains the resource keys, fetched records, snapshots and the pure rules
//! (line filtering, vehicle classification, device labels) that the polling
//! core is built on. This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod identity;
pub mod value_objects;
pub mod vehicle_type;

pub use entities::*;
pub use errors::DomainError;
pub use identity::{
    DeviceIdentity, derive_stop_identity, derive_vehicle_identity, direction_suffix,
    initial_stop_device_name, initial_vehicle_device_name, title_case,
};
pub use value_objects::*;
pub use vehicle_type::{VehicleType, classify};
