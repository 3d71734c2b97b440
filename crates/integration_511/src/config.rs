//! 511 client configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration for the 511 transit API client
#[derive(Clone, Serialize, Deserialize)]
pub struct Transit511Config {
    /// 511.org API token
    #[serde(default)]
    pub api_key: String,

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

impl Default for Transit511Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            enable_api_logging: false,
        }
    }
}

impl fmt::Debug for Transit511Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transit511Config")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("enable_api_logging", &self.enable_api_logging)
            .finish()
    }
}

impl Transit511Config {
    /// Default configuration with the given API key
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            timeout_secs: 5,
            enable_api_logging: false,
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("api_key must not be empty".to_string());
        }

        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| format!("base_url is not a valid URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("base_url must use http or https, got {}", parsed.scheme()));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}
