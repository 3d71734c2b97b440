//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `transit511.toml` (or an explicit file), then environment variables
//! prefixed with `TRANSIT511_`, using `__` between nested keys, e.g.
//! `TRANSIT511_API__API_KEY` or `TRANSIT511_TELEMETRY__JSON=true`.

mod api;

use std::path::Path;

use application::EntryConfig;
use config::builder::{ConfigBuilder, DefaultState};
use integration_511::Transit511Config;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

pub use api::ApiConfig;

use crate::telemetry::TelemetryConfig;

/// Name of the optional configuration file, without extension
pub const CONFIG_FILE_NAME: &str = "transit511";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TRANSIT511";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 511 API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging setup
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Configured entries, each a set of stops or vehicles for one operator
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

impl AppConfig {
    /// Load configuration from `transit511.*` in the working directory
    /// (if present) and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = Self::defaults()?
            .add_source(config::File::with_name(CONFIG_FILE_NAME).required(false))
            .add_source(Self::environment());

        builder.build()?.try_deserialize()
    }

    /// Load configuration from an explicit file, then the environment
    ///
    /// The file must exist; its format follows the extension.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = Self::defaults()?
            .add_source(config::File::from(path).required(true))
            .add_source(Self::environment());

        builder.build()?.try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        let api = ApiConfig::default();
        let telemetry = TelemetryConfig::default();

        config::Config::builder()
            .set_default("api.base_url", api.base_url)?
            .set_default("api.timeout_secs", api.timeout_secs)?
            .set_default("api.enable_api_logging", api.enable_api_logging)?
            .set_default("telemetry.log_filter", telemetry.log_filter)?
            .set_default("telemetry.json", telemetry.json)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Validate the whole configuration
    ///
    /// Entries are validated individually; the first failure is reported
    /// with its position.
    pub fn validate(&self) -> Result<(), String> {
        self.api.validate()?;

        for (index, entry) in self.entries.iter().enumerate() {
            entry
                .validate()
                .map_err(|e| format!("entry {index} ({}): {e}", entry.operator))?;
        }

        Ok(())
    }

    /// Client configuration for the 511 API
    ///
    /// API call logging is on when the `api` section asks for it or when any
    /// entry does.
    pub fn to_client_config(&self) -> Transit511Config {
        let entry_logging = self.entries.iter().any(|e| e.enable_api_logging);

        Transit511Config {
            api_key: self
                .api
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string())
                .unwrap_or_default(),
            base_url: self.api.base_url.clone(),
            timeout_secs: self.api.timeout_secs,
            enable_api_logging: self.api.enable_api_logging || entry_logging,
        }
    }
}
