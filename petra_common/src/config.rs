//! Configuration loading traits and types.
//!
//! PETRA reads one TOML file. Every section is optional and falls back to
//! the defaults in [`crate::consts`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use petra_common::config::{ConfigLoader, PetraConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = PetraConfig::load(Path::new("petra.toml"))?;
//!     config.validate()?;
//!     println!("Control port: {}", config.server.control_port);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_ACTUATORS_DEVICE, DEFAULT_BIND_ADDRESS, DEFAULT_CONTROL_PORT,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SENSORS_DEVICE, DEFAULT_TELEMETRY_SEND_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every register transfer.
    Trace,
    /// Per-command detail.
    Debug,
    /// Session lifecycle.
    #[default]
    Info,
    /// Ignored commands, recoverable problems.
    Warn,
    /// Failed transfers and connections.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fields common to every PETRA process.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "petra-bench-02"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Instance identifier, appears in logs.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "petra".to_string(),
        }
    }
}

/// Hardware channel selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Registered driver name ("device" or "simulation").
    pub driver: String,
    /// Sensor device path, opened read-only.
    pub sensors: String,
    /// Actuator device path, opened write-only.
    pub actuators: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            driver: "device".to_string(),
            sensors: DEFAULT_SENSORS_DEVICE.to_string(),
            actuators: DEFAULT_ACTUATORS_DEVICE.to_string(),
        }
    }
}

/// Network listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address both listeners bind to.
    pub bind_address: String,
    /// Control connection port.
    pub control_port: u16,
    /// Telemetry port. `None` means `control_port + 1`.
    pub telemetry_port: Option<u16>,
    /// Write timeout on the telemetry socket.
    pub telemetry_send_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            control_port: DEFAULT_CONTROL_PORT,
            telemetry_port: None,
            telemetry_send_timeout_ms: DEFAULT_TELEMETRY_SEND_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    /// Effective telemetry port.
    pub fn telemetry_port(&self) -> u16 {
        self.telemetry_port
            .unwrap_or_else(|| self.control_port.wrapping_add(1))
    }

    /// Telemetry write timeout, `None` when disabled (0).
    pub fn telemetry_send_timeout(&self) -> Option<Duration> {
        (self.telemetry_send_timeout_ms > 0)
            .then(|| Duration::from_millis(self.telemetry_send_timeout_ms))
    }
}

/// Sensor poller timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollerConfig {
    /// Delay between two sensor reads.
    pub interval_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollerConfig {
    /// Polling interval as Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Command processor behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Initial auto-commit mode.
    pub auto_commit: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self { auto_commit: true }
    }
}

/// Complete PETRA server configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PetraConfig {
    /// Logging and identity.
    pub shared: SharedConfig,
    /// Hardware channel.
    pub devices: DeviceConfig,
    /// Listeners.
    pub server: ServerConfig,
    /// Sensor poller.
    pub poller: PollerConfig,
    /// Command processor.
    pub processor: ProcessorConfig,
}

impl PetraConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - a device path or the driver name is empty
    /// - the bind address is empty
    /// - the poll interval is zero
    /// - control and telemetry ports collide (except both ephemeral)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        if self.devices.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "devices.driver cannot be empty".to_string(),
            ));
        }
        if self.devices.sensors.is_empty() || self.devices.actuators.is_empty() {
            return Err(ConfigError::ValidationError(
                "device paths cannot be empty".to_string(),
            ));
        }
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "server.bind_address cannot be empty".to_string(),
            ));
        }
        if self.poller.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poller.interval_ms must be > 0".to_string(),
            ));
        }
        let control = self.server.control_port;
        let telemetry = self.server.telemetry_port();
        if control == telemetry && control != 0 {
            return Err(ConfigError::ValidationError(format!(
                "control and telemetry ports must differ (both {control})"
            )));
        }
        Ok(())
    }

    /// Load from `path`, or return defaults when `path` is absent and
    /// `required` is false.
    pub fn load_or_default(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Ok(config) => {
                debug!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(ConfigError::FileNotFound) if !required => {
                info!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => {
                warn!("Configuration {} rejected: {e}", path.display());
                Err(e)
            }
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
