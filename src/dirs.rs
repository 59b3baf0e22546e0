//! Centralized filesystem paths for echohub.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | Linux | macOS |
//! |---------|-------|-------|
//! | Data (registry, catalog, logs) | `~/.local/share/echohub/` | `~/Library/Application Support/echohub/` |
//! | Config (config.toml, secrets, prompt templates) | `~/.config/echohub/` | `~/Library/Application Support/echohub/` |
//!
//! # Environment Overrides
//!
//! - `ECHOHUB_DATA_DIR` overrides [`data_dir`]
//! - `ECHOHUB_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/echohub/` by default. Override with
/// the `ECHOHUB_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ECHOHUB_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("echohub"))
        .unwrap_or_else(|| PathBuf::from("/tmp/echohub-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/echohub/` by default. Override with
/// the `ECHOHUB_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ECHOHUB_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("echohub"))
        .unwrap_or_else(|| PathBuf::from("/tmp/echohub-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Device registry file (`data_dir()/devices.json`).
#[must_use]
pub fn registry_file() -> PathBuf {
    data_dir().join("devices.json")
}

/// Model catalog file (`data_dir()/model_catalog.json`).
#[must_use]
pub fn catalog_file() -> PathBuf {
    data_dir().join("model_catalog.json")
}

/// Prompt template directory (`config_dir()/prompt_templates/`).
#[must_use]
pub fn templates_dir() -> PathBuf {
    config_dir().join("prompt_templates")
}

/// API key file (`config_dir()/secrets/apis.json`).
#[must_use]
pub fn secrets_file() -> PathBuf {
    config_dir().join("secrets").join("apis.json")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}
