/*!
 * Configuration management for vlift.
 *
 * This module provides functionality to load, validate, and access
 * configuration settings: logging, hardware communication defaults and the
 * per-device entries (hardware kind, server address, port, TLS flag) that
 * the hardware layer consumes but does not own.
 */
use std::path::Path;
use std::sync::Arc;

use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{HardwareKind, Id};

/// Core configuration for vlift
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Hardware communication defaults
    #[serde(default)]
    pub hardware: HardwareDefaults,

    /// Configured devices (shuttles, measuring devices)
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to stdout
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,

    /// Whether to use JSON format for logs
    #[serde(default)]
    pub json_format: bool,
}

/// Hardware communication defaults
///
/// Timeouts bound every network call to a device; a value of `0` disables
/// the bound (legacy behaviour of the lift protocol, where the peer closing
/// the connection ends the exchange).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareDefaults {
    /// Timeout for establishing a connection, in milliseconds (0 = none)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Timeout for reading a response, in milliseconds (0 = none)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Device session lease, in milliseconds (0 = sessions never expire
    /// and must be released explicitly)
    #[serde(default)]
    pub session_lease_ms: u64,
}

/// Configuration of one physical device
///
/// One entry per shuttle or measuring device. Each device maps to exactly
/// one storage/scan location; that uniqueness is enforced by the data layer
/// that produces these entries, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable device key (e.g. shuttle name or measuring-device id)
    pub id: Id,

    /// Hardware family driving the device
    #[serde(default)]
    pub kind: HardwareKind,

    /// Hostname or IP address of the server
    #[serde(default)]
    pub host: String,

    /// Network port of the server on which to send the message
    #[serde(default)]
    pub port: u16,

    /// Set this if the server expects TLS wrapped communication
    #[serde(default)]
    pub use_tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            hardware: HardwareDefaults::default(),
            devices: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stdout: default_log_stdout(),
            json_format: false,
        }
    }
}

impl Default for HardwareDefaults {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            session_lease_ms: 0,
        }
    }
}

impl Config {
    /// Find a configured device by its key
    pub fn device(&self, id: &Id) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| &d.id == id)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_stdout() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

/// A builder for creating a configuration
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<String>,
    environment_prefix: Option<String>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config file path
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Set the environment variable prefix for configuration
    pub fn with_environment_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.environment_prefix = Some(prefix.as_ref().to_string());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        let mut config_builder = ConfigLib::builder();

        // Start with default values
        let default_config = Config::default();
        config_builder = config_builder.add_source(
            config::Config::try_from(&default_config)
                .map_err(|e| Error::config(format!("Failed to create default config: {}", e)))?,
        );

        // Add configuration from file if specified
        if let Some(config_file) = self.config_file {
            let path = Path::new(&config_file);
            if path.exists() {
                debug!("Loading configuration from {}", config_file);
                config_builder = config_builder.add_source(File::with_name(&config_file));
            } else {
                debug!("Configuration file {} does not exist, using defaults", config_file);
            }
        }

        // Add configuration from environment variables if prefix is specified
        if let Some(prefix) = self.environment_prefix {
            debug!("Loading configuration from environment variables with prefix {}", prefix);
            config_builder = config_builder.add_source(
                Environment::with_prefix(&prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config_lib = config_builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build configuration: {}", e)))?;

        let config: Config = config_lib
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize configuration: {}", e)))?;

        info!("Configuration loaded successfully");
        Ok(config)
    }
}

/// A thread-safe reference to a configuration
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<Config>);

impl SharedConfig {
    /// Create a new SharedConfig
    pub fn new(config: Config) -> Self {
        Self(Arc::new(config))
    }

    /// Get a reference to the config
    pub fn get(&self) -> &Config {
        &self.0
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

impl AsRef<Config> for SharedConfig {
    fn as_ref(&self) -> &Config {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.hardware.connect_timeout_ms, 10_000);
        assert_eq!(config.hardware.read_timeout_ms, 30_000);
        assert_eq!(config.hardware.session_lease_ms, 0);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_config_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.hardware.connect_timeout_ms, 10_000);
    }

    #[test]
    fn test_config_builder_with_file() -> Result<()> {
        let dir = tempdir().map_err(|e| Error::other(e.to_string()))?;
        let file_path = dir.path().join("config.toml");

        {
            let mut file = File::create(&file_path).map_err(|e| Error::other(e.to_string()))?;
            file.write_all(
                br#"
                [logging]
                level = "debug"

                [hardware]
                connect_timeout_ms = 2500

                [[devices]]
                id = "SH1"
                kind = "kardex"
                host = "10.0.0.12"
                port = 6000
                use_tls = true

                [[devices]]
                id = "zippcube-0"
            "#,
            )
            .map_err(|e| Error::other(e.to_string()))?;
        }

        let config = ConfigBuilder::new().with_config_file(file_path).build()?;

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.hardware.connect_timeout_ms, 2500);
        assert_eq!(config.devices.len(), 2);

        let shuttle = config.device(&Id::from("SH1")).unwrap();
        assert_eq!(shuttle.kind, HardwareKind::Kardex);
        assert_eq!(shuttle.host, "10.0.0.12");
        assert_eq!(shuttle.port, 6000);
        assert!(shuttle.use_tls);

        let zippcube = config.device(&Id::from("zippcube-0")).unwrap();
        assert_eq!(zippcube.kind, HardwareKind::Simulation);
        assert!(!zippcube.use_tls);

        Ok(())
    }

    #[test]
    fn test_config_builder_with_env() -> Result<()> {
        env::set_var("VLIFT__LOGGING__LEVEL", "trace");
        env::set_var("VLIFT__HARDWARE__READ_TIMEOUT_MS", "1500");

        let config = ConfigBuilder::new()
            .with_environment_prefix("vlift")
            .build()?;

        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.hardware.read_timeout_ms, 1500);

        // Clean up
        env::remove_var("VLIFT__LOGGING__LEVEL");
        env::remove_var("VLIFT__HARDWARE__READ_TIMEOUT_MS");

        Ok(())
    }

    #[test]
    fn test_shared_config() {
        let config = Config::default();
        let shared = SharedConfig::new(config);

        assert_eq!(shared.get().logging.level, "info");

        let shared2 = shared.clone();
        assert_eq!(shared2.get().logging.level, "info");
    }
}
