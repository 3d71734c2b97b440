//! 511 adapter - Implements ResourceFetcher using integration_511

use std::sync::Arc;

use application::error::ApplicationError;
use application::ports::ResourceFetcher;
use async_trait::async_trait;
use domain::{ResourceKey, ResourceSnapshot};
use integration_511::{MonitoringClient, Transit511Client, Transit511Config, Transit511Error};
use tracing::{debug, instrument, warn};

/// Adapter fetching stop and vehicle snapshots from the 511 API
pub struct Transit511Adapter {
    client: Arc<dyn MonitoringClient>,
}

impl std::fmt::Debug for Transit511Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transit511Adapter")
            .field("client", &"MonitoringClient")
            .finish()
    }
}

impl Transit511Adapter {
    /// Create an adapter with a reqwest client built from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// fails to initialize.
    pub fn new(config: &Transit511Config) -> Result<Self, ApplicationError> {
        let client = Transit511Client::new(config).map_err(Self::map_error)?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Wrap an existing client
    pub fn with_client(client: Arc<dyn MonitoringClient>) -> Self {
        Self { client }
    }

    /// Check that the API key is accepted upstream
    pub async fn validate_credentials(&self) -> Result<(), ApplicationError> {
        self.client
            .validate_credentials()
            .await
            .map_err(Self::map_error)
    }

    /// Map integration error to application error
    fn map_error(err: Transit511Error) -> ApplicationError {
        match err {
            Transit511Error::AuthFailure { status } => {
                ApplicationError::AuthFailure(format!("HTTP {status}"))
            },
            Transit511Error::RateLimited {
                retry_after_secs, ..
            } => ApplicationError::RateLimited { retry_after_secs },
            Transit511Error::MalformedResponse(e) => ApplicationError::MalformedResponse(e),
            Transit511Error::TransportFailure(e) => ApplicationError::TransportFailure(e),
            Transit511Error::Configuration(e) => ApplicationError::Configuration(e),
        }
    }
}

#[async_trait]
impl ResourceFetcher for Transit511Adapter {
    #[instrument(skip(self), fields(key = %key))]
    async fn fetch(&self, key: &ResourceKey) -> Result<ResourceSnapshot, ApplicationError> {
        match self.client.fetch(key).await {
            Ok(snapshot) => {
                debug!(records = snapshot.len(), "Fetched snapshot");
                Ok(snapshot)
            },
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Fetch failed");
                Err(Self::map_error(e))
            },
        }
    }
}
