//! 511 SIRI monitoring client
//!
//! One HTTP round trip per call, no caching. Status codes and body content
//! are classified into [`Transit511Error`] variants before any parsing.

use std::time::Duration;

use async_trait::async_trait;
use domain::{ResourceKey, ResourceKind, ResourceSnapshot};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, instrument};

use crate::config::Transit511Config;
use crate::error::Transit511Error;
use crate::models::parse_monitoring_response;

const STOP_MONITORING: &str = "StopMonitoring";
const VEHICLE_MONITORING: &str = "VehicleMonitoring";

/// Agency used for credential validation
const VALIDATION_AGENCY: &str = "SF";

/// Trait for clients fetching monitoring data for a resource
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    /// Fetch the current snapshot for a stop or vehicle
    async fn fetch(&self, key: &ResourceKey) -> Result<ResourceSnapshot, Transit511Error>;

    /// Check that the configured API key is accepted
    async fn validate_credentials(&self) -> Result<(), Transit511Error>;
}

/// reqwest-based client for `api.511.org`
#[derive(Debug)]
pub struct Transit511Client {
    client: Client,
    config: Transit511Config,
}

impl Transit511Client {
    /// Create a new 511 client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &Transit511Config) -> Result<Self, Transit511Error> {
        config.validate().map_err(Transit511Error::Configuration)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("transit511/0.2")
            .build()
            .map_err(|e| Transit511Error::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Perform one monitoring request and decode its body
    async fn request(
        &self,
        endpoint: &str,
        kind: ResourceKind,
        params: &[(&str, &str)],
    ) -> Result<ResourceSnapshot, Transit511Error> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));

        if self.config.enable_api_logging {
            info!(endpoint, ?params, "API call");
        }

        let mut query: Vec<(&str, &str)> =
            vec![("api_key", self.config.api_key.as_str()), ("format", "JSON")];
        query.extend_from_slice(params);

        debug!(?url, "Requesting monitoring data");

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        debug!(%status, "Response status");

        if status == StatusCode::TOO_MANY_REQUESTS {
            error!("Rate limit exceeded for 511 API");
            return Err(Transit511Error::RateLimited {
                message: format!("HTTP {status}"),
                retry_after_secs: response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            });
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Authentication failed for 511 API");
            return Err(Transit511Error::AuthFailure {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(Transit511Error::TransportFailure(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        parse_monitoring_response(kind, &body).inspect_err(|e| error!(error = %e, "Bad response body"))
    }

    fn transport_error(&self, e: &reqwest::Error) -> Transit511Error {
        if e.is_timeout() {
            Transit511Error::TransportFailure(format!(
                "timed out after {} seconds",
                self.config.timeout_secs
            ))
        } else {
            Transit511Error::TransportFailure(e.to_string())
        }
    }
}

#[async_trait]
impl MonitoringClient for Transit511Client {
    #[instrument(skip(self), fields(key = %key))]
    async fn fetch(&self, key: &ResourceKey) -> Result<ResourceSnapshot, Transit511Error> {
        let snapshot = match key.kind() {
            ResourceKind::Stop => {
                self.request(
                    STOP_MONITORING,
                    ResourceKind::Stop,
                    &[("agency", key.operator()), ("stopCode", key.target())],
                )
                .await?
            },
            ResourceKind::Vehicle => {
                self.request(
                    VEHICLE_MONITORING,
                    ResourceKind::Vehicle,
                    &[("agency", key.operator()), ("vehicleID", key.target())],
                )
                .await?
            },
        };

        debug!(count = snapshot.len(), "Monitoring records fetched");
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn validate_credentials(&self) -> Result<(), Transit511Error> {
        self.request(
            STOP_MONITORING,
            ResourceKind::Stop,
            &[("agency", VALIDATION_AGENCY)],
        )
        .await
        .map(|_| ())
    }
}
