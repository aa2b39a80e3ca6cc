//! Configuration management for async-select.
//!
//! This module handles loading package settings from the user's config
//! directory and the environment, and building per-component configuration.

mod select;
mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use select::{ImageSize, RemoteConfig, SelectConfig};
pub use settings::{InternalSettings, Settings};

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "async-select";

/// Settings file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Prefix of environment variables overriding settings.
pub const ENV_PREFIX: &str = "ASYNC_SELECT_";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform config directory could be determined.
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The config file is not valid TOML for the settings.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    ValidationError(String),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidEnv { key: String, value: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Path of the settings file, e.g. `~/.config/async-select/config.toml`.
pub fn config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigDir)
}
