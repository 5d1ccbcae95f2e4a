//! Service configuration
//!
//! Loaded from a YAML file, then overridden by `ADARCA__`-prefixed
//! environment variables (`ADARCA__WEB__TOKEN`, `ADARCA__PRTG__URL`, ...).

use orchestrator::TicketDefaults;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use vendor_clients::{
    CiscoSupportConfig, DateTimeConfig, GeocodeConfig, GisConfig, MerakiConfig, NetCloudConfig, OpsgenieConfig,
    PrtgConfig, ServiceNowConfig, TwitterConfig,
};

use crate::rate_limit::RateLimitConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// HTTP listener and inbound authentication
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret expected in the `X-API-Key` header
    pub token: String,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl WebConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Per signal lookup
    #[serde(default = "default_timeout_secs")]
    pub signal_secs: u64,
    /// Per ticketing, alerting or social call
    #[serde(default = "default_timeout_secs")]
    pub collaborator_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            signal_secs: default_timeout_secs(),
            collaborator_secs: default_timeout_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn signal(&self) -> Duration {
        Duration::from_secs(self.signal_secs)
    }

    pub fn collaborator(&self) -> Duration {
        Duration::from_secs(self.collaborator_secs)
    }
}

fn default_vendor() -> String {
    "Cisco".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarrantyConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Manufacturer whose devices are checked
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default)]
    pub support: CiscoSupportConfig,
}

impl Default for WarrantyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            vendor: default_vendor(),
            support: CiscoSupportConfig::default(),
        }
    }
}

/// Whole service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub web: WebConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    pub tickets: TicketDefaults,
    pub prtg: PrtgConfig,
    pub opsgenie: OpsgenieConfig,
    pub snow: ServiceNowConfig,
    pub meraki: MerakiConfig,
    pub netcloud: NetCloudConfig,
    pub twitter: TwitterConfig,
    pub geocode: GeocodeConfig,
    pub gis: GisConfig,
    /// Rendering of utility outage timestamps
    #[serde(default)]
    pub date_time: DateTimeConfig,
    #[serde(default)]
    pub warranty: WarrantyConfig,
}

impl AppConfig {
    /// Load the YAML file at `path` layered with environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix("ADARCA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.web.token.trim().is_empty() {
            return Err(ConfigError::Invalid("web.token must not be empty".to_string()));
        }
        if self.meraki.org_id.is_none() && self.meraki.org_name.is_none() {
            return Err(ConfigError::Invalid(
                "meraki needs org_id or org_name".to_string(),
            ));
        }
        if self.timeouts.signal_secs == 0 || self.timeouts.collaborator_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".to_string()));
        }
        if !self.date_time.is_valid_format() {
            return Err(ConfigError::Invalid(format!(
                "date_time.time_format '{}' is not a valid strftime format",
                self.date_time.time_format
            )));
        }
        Ok(())
    }
}
