//! Device identity carried in HTTP request headers.

use crate::key::{is_usable_device_id, is_valid_mac};

pub const HEADER_DEVICE_MAC: &str = "X-Device-MAC";
/// Older firmware spells the MAC header in mixed case.
pub const HEADER_DEVICE_MAC_ALT: &str = "X-Device-Mac";
pub const HEADER_DEVICE_ID: &str = "X-Device-Id";
pub const HEADER_DEVICE_NAME: &str = "X-Device-Name";
pub const HEADER_DEVICE_MODEL: &str = "X-Device-Model";

pub const DEFAULT_DEVICE_NAME: &str = "Unknown Device";
pub const DEFAULT_MODEL_NAME: &str = "Unknown Model";

/// Identity headers sent by a client device. Empty header values are treated
/// as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceHeaders {
    pub mac_address: Option<String>,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub model_name: Option<String>,
}

impl DeviceHeaders {
    /// Build from any header lookup, e.g. a closure over an HTTP header map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            mac_address: get(HEADER_DEVICE_MAC).or_else(|| get(HEADER_DEVICE_MAC_ALT)),
            device_id: get(HEADER_DEVICE_ID),
            device_name: get(HEADER_DEVICE_NAME),
            model_name: get(HEADER_DEVICE_MODEL),
        }
    }

    /// The identifier used for activity updates: MAC first, then device id.
    pub fn identifier(&self) -> Option<&str> {
        self.mac_address
            .as_deref()
            .or(self.device_id.as_deref())
    }

    /// Whether these headers carry enough identity to auto-register a device.
    pub fn is_registrable(&self) -> bool {
        self.mac_address.as_deref().is_some_and(is_valid_mac)
            || self.device_id.as_deref().is_some_and(is_usable_device_id)
    }

    pub fn device_name_or_default(&self) -> &str {
        self.device_name.as_deref().unwrap_or(DEFAULT_DEVICE_NAME)
    }

    pub fn model_name_or_default(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL_NAME)
    }
}
