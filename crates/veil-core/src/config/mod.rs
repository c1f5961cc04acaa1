//! Configuration management for veil.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every section, so a missing file is a valid configuration for the
//! development network.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the diagnostic verbosity.
pub const DEBUG_ENV: &str = "DEBUG";

/// Root configuration structure for veil.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Directory scan settings
    pub scan: ScanConfig,

    /// Threshold network settings
    pub network: NetworkConfig,

    /// Access policy settings
    pub policy: PolicyConfig,

    /// Content store settings; publishing is skipped when absent
    pub storage: Option<StorageConfig>,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.veil.veil/config.toml
    /// - Linux: ~/.config/veil/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\veil\config\config.toml
    ///
    /// Falls back to ~/.veil/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "veil", "veil")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".veil").join("config.toml")
            })
    }

    /// Get the resolved mnemonic file path (with ~ expansion).
    pub fn mnemonic_path(&self) -> PathBuf {
        let path_str = self.general.mnemonic_path.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Storage credentials, if publishing is configured.
    pub fn storage_credentials(&self) -> Option<StorageCredentials> {
        self.storage.as_ref().and_then(StorageConfig::credentials)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Interpret a `DEBUG` value: `true` is 1, a digit string is its value, anything else 0.
pub fn parse_debug_level(value: Option<&str>) -> u8 {
    match value {
        Some("true") => 1,
        Some(v) if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) => {
            v.parse::<u64>().map(|n| n.min(u8::MAX as u64) as u8).unwrap_or(u8::MAX)
        }
        _ => 0,
    }
}

/// Read the debug level from the process environment.
pub fn debug_level_from_env() -> u8 {
    parse_debug_level(std::env::var(DEBUG_ENV).ok().as_deref())
}
