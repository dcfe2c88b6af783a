//! Configuration management for the daemon.

use std::env;
use std::path::PathBuf;

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// JSON file backing the platform state
    pub state_path: PathBuf,
    /// Whether the simulated hardware has two partition sets
    pub dual_system: bool,
    /// Firmware version seeded into a fresh state file
    pub firmware_version: Option<String>,
    /// Bootloader version seeded into a fresh state file
    pub bootloader_version: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3070".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let state_path = lookup("STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fwupdate-state.json"));

        let dual_system = match lookup("DUAL_SYSTEM") {
            Some(value) => parse_flag("DUAL_SYSTEM", &value)?,
            None => true,
        };

        let firmware_version = lookup("FIRMWARE_VERSION").filter(|v| !v.is_empty());
        let bootloader_version = lookup("BOOTLOADER_VERSION").filter(|v| !v.is_empty());

        Ok(Self {
            host,
            port,
            state_path,
            dual_system,
            firmware_version,
            bootloader_version,
        })
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag(name)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid boolean for {0}")]
    InvalidFlag(&'static str),
}
