//! Registry configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Tuning and storage settings for a [`DeviceRegistry`](crate::DeviceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry file location. `None` lets the host application choose.
    pub path: Option<PathBuf>,
    /// Seconds without activity after which the sweep marks a device offline.
    pub offline_after_secs: u64,
    /// Seconds between offline sweeps.
    pub sweep_interval_secs: u64,
    /// Persist after every Nth successful `update_last_seen`.
    pub heartbeat_save_every: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: None,
            offline_after_secs: 120,
            sweep_interval_secs: 60,
            heartbeat_save_every: 5,
        }
    }
}

impl RegistryConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if any interval or the heartbeat
    /// save cadence is zero.
    pub fn validate(&self) -> Result<()> {
        if self.offline_after_secs == 0 {
            return Err(RegistryError::Config(
                "offline_after_secs must be greater than 0".into(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(RegistryError::Config(
                "sweep_interval_secs must be greater than 0".into(),
            ));
        }
        if self.heartbeat_save_every == 0 {
            return Err(RegistryError::Config(
                "heartbeat_save_every must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
