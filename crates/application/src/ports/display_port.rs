//! Display layer port
//!
//! The host that renders devices and entities. Called synchronously from
//! poller notifications, so implementations must not block.

use domain::{FilteredSnapshot, ResourceKey};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Device metadata announced before any data arrives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Stable device identifier, e.g. `SF_18031_N`
    pub device_id: String,
    /// Initial display name
    pub name: String,
    /// Operator display name
    pub manufacturer: String,
    /// e.g. `Stop 18031` or `Vehicle 1502`
    pub model: String,
    /// Resource the device shows
    pub key: ResourceKey,
}

/// Port for pushing view state to the display layer
#[cfg_attr(test, automock)]
pub trait DisplayPort: Send + Sync {
    /// Announce a device with its initial name
    fn register_device(&self, device: &DeviceInfo);

    /// Rename a device once its identity is known
    fn rename_device(&self, device_id: &str, label: &str);

    /// Publish a view's latest projection
    fn publish_state(&self, device_id: &str, snapshot: &FilteredSnapshot, last_success: bool);

    /// Withdraw a device when its entry is unloaded or its setup is rolled back
    fn remove_device(&self, device_id: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn DisplayPort) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn DisplayPort>();
    }

    #[test]
    fn mock_records_rename() {
        let mut mock = MockDisplayPort::new();
        mock.expect_rename_device()
            .withf(|id, label| id == "SF_18031_N" && label.starts_with("N Judah"))
            .times(1)
            .return_const(());

        mock.rename_device("SF_18031_N", "N Judah Train - Duboce Ave & Church St IB");
    }

    #[test]
    fn mock_records_removal() {
        let mut mock = MockDisplayPort::new();
        mock.expect_remove_device()
            .withf(|id| id == "SF_18031_N")
            .times(1)
            .return_const(());

        mock.remove_device("SF_18031_N");
    }
}
