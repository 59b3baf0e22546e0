//! Core types for the device registry.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Heard from within the offline threshold.
    Online,
    /// Marked stale by the periodic sweep.
    Offline,
}

impl DeviceStatus {
    /// The wire name of this status (`"online"` / `"offline"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single registered device.
///
/// The custom-name fields form a unit: `has_custom_name` is true exactly
/// when `custom_name` is set, and the two audit fields are populated
/// alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Client-reported identifier; may change across registrations.
    pub device_id: String,
    /// Name reported by the device itself.
    pub device_name: String,
    /// User-assigned display name.
    pub custom_name: Option<String>,
    /// Whether `custom_name` is set.
    #[serde(default)]
    pub has_custom_name: bool,
    /// When the custom name was last changed.
    #[serde(default, with = "timestamp::option")]
    pub custom_name_updated_at: Option<NaiveDateTime>,
    /// Device id of whoever last changed the custom name.
    pub custom_name_updated_by: Option<String>,
    /// Hardware model reported by the device.
    pub model_name: String,
    /// Last known network address.
    pub ip_address: String,
    /// Hardware address, or the device key when none was supplied.
    pub mac_address: String,
    /// Online/offline lifecycle state.
    pub status: DeviceStatus,
    /// Creation time; never modified afterwards.
    #[serde(with = "timestamp")]
    pub first_seen: NaiveDateTime,
    /// Time of the most recent registration or activity signal.
    #[serde(with = "timestamp")]
    pub last_seen: NaiveDateTime,
    /// Key of the device this accessory is attached to (Bluetooth peripherals).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_device: Option<String>,
    /// Device class, e.g. `"bluetooth"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

impl DeviceRecord {
    /// The name shown to users: the custom name when set, else the reported name.
    pub fn display_name(&self) -> &str {
        self.custom_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.device_name)
    }

    /// Whether this device is a Bluetooth accessory.
    pub fn is_bluetooth(&self) -> bool {
        self.device_type.as_deref() == Some("bluetooth")
    }
}

/// Input to [`DeviceRegistry::register`](crate::DeviceRegistry::register).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub device_id: String,
    pub device_name: String,
    pub model_name: String,
    pub ip_address: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub parent_device: Option<String>,
}

impl RegistrationRequest {
    /// Create a request with the four mandatory fields.
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        model_name: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            model_name: model_name.into(),
            ip_address: ip_address.into(),
            ..Default::default()
        }
    }

    /// Attach a hardware address.
    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = Some(mac.into());
        self
    }

    /// Attach a device class.
    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Attach a parent device key.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_device = Some(parent.into());
        self
    }
}

/// Device counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
}

/// ISO-8601 naive (UTC) timestamps with microsecond precision,
/// e.g. `2025-11-09T14:22:15.123456`.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
    const READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    /// Render a timestamp in the registry file format.
    pub fn format(ts: &NaiveDateTime) -> String {
        ts.format(WRITE_FORMAT).to_string()
    }

    /// Parse a timestamp, with or without fractional seconds.
    pub fn parse(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, READ_FORMAT)
    }

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&super::format(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 9)
            .and_then(|d| d.and_hms_micro_opt(h, m, s, micro))
            .unwrap()
    }

    fn sample() -> DeviceRecord {
        DeviceRecord {
            device_id: "esp32-01".into(),
            device_name: "Kitchen Node".into(),
            custom_name: None,
            has_custom_name: false,
            custom_name_updated_at: None,
            custom_name_updated_by: None,
            model_name: "ESP32-S3".into(),
            ip_address: "192.168.1.20".into(),
            mac_address: "AA:BB:CC:DD:EE:FF".into(),
            status: DeviceStatus::Online,
            first_seen: ts(14, 22, 15, 123_456),
            last_seen: ts(14, 22, 15, 123_456),
            parent_device: None,
            device_type: None,
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DeviceStatus::Online).unwrap(), "\"online\"");
        assert_eq!(serde_json::to_string(&DeviceStatus::Offline).unwrap(), "\"offline\"");
        assert_eq!(DeviceStatus::Offline.to_string(), "offline");
    }

    #[test]
    fn timestamps_use_iso_microseconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["first_seen"], "2025-11-09T14:22:15.123456");
        assert!(json["custom_name_updated_at"].is_null());
    }

    #[test]
    fn optional_relationship_fields_are_omitted_when_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("parent_device").is_none());
        assert!(json.get("device_type").is_none());
    }

    #[test]
    fn parses_timestamps_without_fraction() {
        let parsed = timestamp::parse("2025-11-09T14:22:15").unwrap();
        assert_eq!(parsed, ts(14, 22, 15, 0));
    }

    #[test]
    fn display_name_prefers_custom_name() {
        let mut record = sample();
        assert_eq!(record.display_name(), "Kitchen Node");
        record.custom_name = Some("Lamp".into());
        record.has_custom_name = true;
        assert_eq!(record.display_name(), "Lamp");
    }

    #[test]
    fn record_survives_json_reload() {
        let mut record = sample();
        record.custom_name = Some("Lamp".into());
        record.has_custom_name = true;
        record.custom_name_updated_at = Some(ts(15, 0, 0, 1));
        record.device_type = Some("bluetooth".into());
        let text = serde_json::to_string(&record).unwrap();
        let back: DeviceRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
        assert!(back.is_bluetooth());
    }
}
