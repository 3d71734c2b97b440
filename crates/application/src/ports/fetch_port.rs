//! Upstream fetch port
//!
//! One call is one upstream round trip. Implementations must not cache;
//! sharing is the poller registry's job.

use async_trait::async_trait;
use domain::{ResourceKey, ResourceSnapshot};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for fetching the current data of a stop or vehicle
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the current snapshot for `key`
    async fn fetch(&self, key: &ResourceKey) -> Result<ResourceSnapshot, ApplicationError>;
}
