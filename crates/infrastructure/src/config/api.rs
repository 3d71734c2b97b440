//! 511 API access configuration

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// 511 API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 511.org API token (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Base URL for the transit API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Log every upstream call at info level
    #[serde(default)]
    pub enable_api_logging: bool,
}

fn default_base_url() -> String {
    "https://api.511.org/transit".to_string()
}

const fn default_timeout_secs() -> u64 {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            enable_api_logging: false,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("enable_api_logging", &self.enable_api_logging)
            .finish()
    }
}

impl ApiConfig {
    /// Validate the API section
    pub fn validate(&self) -> Result<(), String> {
        let has_key = self
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty());
        if !has_key {
            return Err("api.api_key must be set".to_string());
        }

        if self.base_url.is_empty() {
            return Err("api.base_url cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("api.timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
