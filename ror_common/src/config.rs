//! Configuration loading traits and types.
//!
//! Every binary in the workspace reads a single `roof.toml`. Loading goes
//! through the blanket [`ConfigLoader`] trait; [`RoofConfig`] adds
//! semantic validation and saving.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ror_common::config::{ConfigError, RoofConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = RoofConfig::load_validated(Path::new("roof.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::consts::{
    ACTIVE_POLL_MS, DEFAULT_MOTION_TIMEOUT_S, DEFAULT_SERVICE_NAME, IDLE_POLL_MS,
    INITIAL_POLL_MS, MOTION_TIMEOUT_RANGE_S,
};
use crate::io::config::IoConfig;

/// Error type for configuration operations.
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

    /// Serializing or writing the file failed.
    #[error("Failed to save configuration: {0}")]
    WriteError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "rolloff-roof"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Implemented for every `serde::de::DeserializeOwned` type.
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

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Roof sections ──────────────────────────────────────────────────

/// `[roof]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofSettings {
    /// Seconds a motion session may run before it is declared timed out.
    #[serde(default = "default_motion_timeout")]
    pub motion_timeout_s: u32,
    /// File holding the last confirmed park position across restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub park_file: Option<PathBuf>,
}

fn default_motion_timeout() -> u32 {
    DEFAULT_MOTION_TIMEOUT_S
}

impl Default for RoofSettings {
    fn default() -> Self {
        Self {
            motion_timeout_s: DEFAULT_MOTION_TIMEOUT_S,
            park_file: None,
        }
    }
}

impl RoofSettings {
    #[inline]
    pub fn motion_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.motion_timeout_s))
    }
}

/// `[poll]` section, all values in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub initial_ms: u64,
    pub idle_ms: u64,
    pub active_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_ms: INITIAL_POLL_MS,
            idle_ms: IDLE_POLL_MS,
            active_ms: ACTIVE_POLL_MS,
        }
    }
}

/// `[gpio]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioSettings {
    /// Driver used when the command line names none.
    pub driver: String,
    /// Root of the Linux sysfs GPIO tree.
    pub sysfs_root: PathBuf,
}

impl Default for GpioSettings {
    fn default() -> Self {
        Self {
            driver: "sysfs".to_string(),
            sysfs_root: PathBuf::from("/sys/class/gpio"),
        }
    }
}

/// Where the simulated roof starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimPosition {
    #[default]
    Closed,
    Opened,
    Between,
}

/// `[simulation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Full travel time from one limit to the other [ms].
    pub travel_time_ms: u64,
    pub initial_position: SimPosition,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            travel_time_ms: 5000,
            initial_position: SimPosition::Closed,
        }
    }
}

// ─── RoofConfig ─────────────────────────────────────────────────────

/// Complete controller configuration (`roof.toml`).
///
/// # TOML Example
///
/// ```toml
/// [roof]
/// motion_timeout_s = 20
///
/// [[io.outputs]]
/// function = "open"
/// pin = 17
/// active = "high"
/// limit = "250ms"
///
/// [[io.inputs]]
/// function = "opened"
/// pin = 22
/// active = "low"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoofConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub roof: RoofSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub gpio: GpioSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub io: IoConfig,
}

impl RoofConfig {
    /// Parse from a TOML string (no validation).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load from file and run [`RoofConfig::validate`].
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that serde cannot express.
    ///
    /// Pin mapping rules are checked by `PinRegistry::configure`, not here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !MOTION_TIMEOUT_RANGE_S.contains(&self.roof.motion_timeout_s) {
            return Err(ConfigError::ValidationError(format!(
                "motion_timeout_s {} outside {}..={}",
                self.roof.motion_timeout_s,
                MOTION_TIMEOUT_RANGE_S.start(),
                MOTION_TIMEOUT_RANGE_S.end()
            )));
        }

        let poll = &self.poll;
        if poll.initial_ms == 0 || poll.idle_ms == 0 || poll.active_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll intervals must be greater than zero".to_string(),
            ));
        }

        if self.simulation.travel_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "simulation.travel_time_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::WriteError(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"error\"")
                .unwrap()
                .level,
            LogLevel::Error
        );
        assert!(toml::from_str::<TestWrapper>("level = \"loud\"").is_err());
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = RoofConfig::load(Path::new("/nonexistent/path/roof.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = RoofConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = RoofConfig::from_toml("").unwrap();
        assert_eq!(config.roof.motion_timeout_s, 15);
        assert_eq!(config.poll, PollSettings::default());
        assert_eq!(config.gpio.driver, "sysfs");
        assert_eq!(config.shared.service_name, DEFAULT_SERVICE_NAME);
        assert!(config.io.outputs.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_motion_timeout_range() {
        let mut config = RoofConfig::default();
        config.roof.motion_timeout_s = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
        config.roof.motion_timeout_s = 301;
        assert!(config.validate().is_err());
        config.roof.motion_timeout_s = 300;
        assert!(config.validate().is_ok());
        assert_eq!(config.roof.motion_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = RoofConfig::from_toml("[poll]\nactive_ms = 0\n").unwrap();
        assert_eq!(config.poll.idle_ms, IDLE_POLL_MS);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = RoofConfig::default();
        config.roof.motion_timeout_s = 42;
        config.simulation.initial_position = SimPosition::Between;
        config.save(file.path()).unwrap();

        let loaded = RoofConfig::load_validated(file.path()).unwrap();
        assert_eq!(loaded, config);
    }
}
