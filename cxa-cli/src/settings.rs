//! Configuration file location and loading

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cxa_device::{DeviceConfig, TransportConfig, DEFAULT_NAME};

/// Get the XDG config directory for cxa
/// Uses $XDG_CONFIG_HOME/cxa on Linux/macOS, falls back to ~/.config/cxa
fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config);
        if path.is_absolute() {
            return Some(path.join("cxa"));
        }
    }

    dirs::home_dir().map(|h| h.join(".config").join("cxa"))
}

/// Default config file path
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

/// Configuration used by `--simulate` when no file exists
pub fn simulated_config() -> DeviceConfig {
    DeviceConfig {
        name: DEFAULT_NAME.to_string(),
        model: "CXA81".to_string(),
        transport: TransportConfig::Serial {
            device: "/dev/null".to_string(),
        },
        companion_host: None,
    }
}

/// Load the device configuration
///
/// `explicit` comes from `--config`; otherwise the XDG location is used.
/// With `simulate` set, a missing default file is not an error.
pub fn load(explicit: Option<&Path>, simulate: bool) -> Result<DeviceConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() || !simulate => path,
            _ => return Ok(simulated_config()),
        },
    };

    load_from(&path)
}

/// Read and parse a config file
pub fn load_from(path: &Path) -> Result<DeviceConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    DeviceConfig::from_json(&text)
        .with_context(|| format!("Invalid config {}", path.display()))
}
