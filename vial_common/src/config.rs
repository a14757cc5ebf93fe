//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for the engine, its hardware driver and the simulated deck.
//!
//! # Usage
//!
//! ```rust,no_run
//! use vial_common::config::{ConfigLoader, SharedConfig, ConfigError};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyAppConfig {
//!     shared: SharedConfig,
//!     port: u16,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = MyAppConfig::load(Path::new("config.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consts::{CONFIG_FILE_NAME, DEFAULT_DRIVER};

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

/// Common configuration fields shared by every vial binary.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "vial-engine-sim"
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

/// Engine section of `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Registered hardware driver name.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Skip hardware calls for module-only commands (lid moves, etc).
    #[serde(default = "default_true")]
    pub use_virtual_modules: bool,

    /// Simulated deck description. Relative paths resolve against the
    /// config directory.
    #[serde(default)]
    pub deck_file: Option<PathBuf>,

    /// Root of versioned liquid class definitions.
    #[serde(default)]
    pub liquid_class_dir: Option<PathBuf>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            use_virtual_modules: true,
            deck_file: None,
            liquid_class_dir: None,
        }
    }
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

fn default_true() -> bool {
    true
}

/// Complete engine configuration (`config.toml`).
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "vial-engine"
///
/// [engine]
/// driver = "simulation"
/// use_virtual_modules = true
/// deck_file = "deck.toml"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Shared fields.
    pub shared: SharedConfig,

    /// Engine fields.
    #[serde(default)]
    pub engine: EngineSection,
}

impl EngineConfig {
    /// Validate shared and engine fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.engine.driver.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.driver cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "vial-engine".to_string(),
            },
            engine: EngineSection::default(),
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for any `serde::de::DeserializeOwned` type.
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

/// Load `config.toml` from a config directory and validate it.
///
/// `deck_file` and `liquid_class_dir` are rewritten to absolute paths under
/// `dir` when given relative.
pub fn load_config_dir(dir: &Path) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::load(&dir.join(CONFIG_FILE_NAME))?;
    config.validate()?;

    if let Some(deck) = config.engine.deck_file.take() {
        config.engine.deck_file = Some(resolve(dir, deck));
    }
    if let Some(classes) = config.engine.liquid_class_dir.take() {
        config.engine.liquid_class_dir = Some(resolve(dir, classes));
    }
    Ok(config)
}

fn resolve(dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        dir.join(path)
    } else {
        path
    }
}
