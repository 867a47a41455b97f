//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for AIO bring-up.
//!
//! # Usage
//!
//! ```rust,no_run
//! use aio_common::config::{AioConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AioConfig::load(Path::new("devices.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::MAX_DRIVERS;

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
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
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

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "aio-devices"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
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

/// Built-in driver kinds that can be brought up from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Byte FIFO echoing writes back to reads.
    Loopback,
    /// Simulated analog-to-digital converter (input only).
    Adc,
    /// Simulated digital-to-analog converter (output only).
    Dac,
}

fn default_instances() -> u8 {
    1
}

fn default_resolution() -> u8 {
    10
}

/// One `[[drivers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Driver implementation to instantiate.
    pub kind: DriverKind,
    /// Root path the driver claims.
    pub root: String,
    /// Number of instances.
    #[serde(default = "default_instances")]
    pub instances: u8,
    /// Converter resolution in bits (ADC/DAC only).
    #[serde(default = "default_resolution")]
    pub resolution_bits: u8,
}

/// Top-level device configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "aio-devices"
///
/// [[drivers]]
/// kind = "adc"
/// root = "/dev/serial/aio/in"
/// instances = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AioConfig {
    /// Shared service settings.
    pub shared: SharedConfig,
    /// Drivers registered at bring-up, in order.
    #[serde(default)]
    pub drivers: Vec<DriverConfig>,
}

impl AioConfig {
    /// Validate the configuration.
    ///
    /// Root path syntax and overlaps are checked by the registry at
    /// registration time.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - the shared section is invalid
    /// - no driver is configured, or more than `MAX_DRIVERS`
    /// - a driver has zero instances
    /// - an ADC/DAC resolution is outside `1..=16`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.drivers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one driver must be configured".to_string(),
            ));
        }
        if self.drivers.len() > MAX_DRIVERS {
            return Err(ConfigError::ValidationError(format!(
                "{} drivers configured, maximum is {MAX_DRIVERS}",
                self.drivers.len()
            )));
        }

        for driver in &self.drivers {
            if driver.instances == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "driver '{}' must have at least one instance",
                    driver.root
                )));
            }
            if driver.kind != DriverKind::Loopback && !(1..=16).contains(&driver.resolution_bits)
            {
                return Err(ConfigError::ValidationError(format!(
                    "driver '{}' resolution {} out of range 1..=16",
                    driver.root, driver.resolution_bits
                )));
            }
        }
        Ok(())
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

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
