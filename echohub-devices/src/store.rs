//! JSON file persistence for the registry.
//!
//! The file holds a single snapshot:
//!
//! ```json
//! {
//!   "devices": { "<device key>": { ...record... } },
//!   "last_updated": "2025-11-09T14:22:15.123456"
//! }
//! ```
//!
//! Writes are atomic (temp file + fsync + rename) so a crash mid-write never
//! leaves a truncated registry behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::types::{timestamp, DeviceRecord};

/// On-disk layout of the registry file.
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    devices: BTreeMap<String, DeviceRecord>,
    #[serde(default, with = "timestamp::option")]
    last_updated: Option<NaiveDateTime>,
}

/// File-backed store for the full device map.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored device map. A missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] if the file cannot be read and
    /// [`RegistryError::Parse`] if it is not a valid snapshot.
    pub fn load(&self) -> Result<BTreeMap<String, DeviceRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            RegistryError::Persistence(format!(
                "failed to read registry file {}: {e}",
                self.path.display()
            ))
        })?;
        let file: RegistryFile = serde_json::from_str(&content).map_err(|e| {
            RegistryError::Parse(format!(
                "failed to parse registry file {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(file.devices)
    }

    /// Atomically replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Persistence`] on any filesystem failure.
    pub fn save(&self, devices: &BTreeMap<String, DeviceRecord>, now: NaiveDateTime) -> Result<()> {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            devices: &'a BTreeMap<String, DeviceRecord>,
            #[serde(with = "timestamp")]
            last_updated: NaiveDateTime,
        }

        let json = serde_json::to_string_pretty(&Snapshot {
            devices,
            last_updated: now,
        })
        .map_err(|e| RegistryError::Persistence(format!("failed to serialize registry: {e}")))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            RegistryError::Persistence(format!(
                "failed to create registry directory {}: {e}",
                dir.display()
            ))
        })?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "devices.json".into());
        let tmp_path = dir.join(format!(".{file_name}.tmp"));
        std::fs::write(&tmp_path, json.as_bytes()).map_err(|e| {
            RegistryError::Persistence(format!(
                "failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;

        if let Ok(file) = std::fs::File::open(&tmp_path) {
            let _ = file.sync_all();
        }

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            RegistryError::Persistence(format!(
                "failed to rename temp file to {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::types::DeviceStatus;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    fn record(key: &str) -> DeviceRecord {
        DeviceRecord {
            device_id: format!("id-{key}"),
            device_name: "Node".into(),
            custom_name: None,
            has_custom_name: false,
            custom_name_updated_at: None,
            custom_name_updated_by: None,
            model_name: "ESP32".into(),
            ip_address: "10.0.0.2".into(),
            mac_address: key.into(),
            status: DeviceStatus::Online,
            first_seen: at(8),
            last_seen: at(9),
            parent_device: None,
            device_type: None,
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("devices.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_preserves_devices() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested").join("devices.json"));
        let mut devices = BTreeMap::new();
        devices.insert("AA:BB:CC:DD:EE:FF".to_string(), record("AA:BB:CC:DD:EE:FF"));
        store.save(&devices, at(10)).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, devices);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["last_updated"], "2025-03-01T10:00:00.000000");
        assert!(raw["devices"]["AA:BB:CC:DD:EE:FF"].is_object());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("devices.json"));
        store.save(&BTreeMap::new(), at(1)).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["devices.json".to_string()]);
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonStore::new(path).load().unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)));
    }

    #[test]
    fn reads_files_without_fractional_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(
            &path,
            r#"{"devices":{"esp-1":{"device_id":"esp-1","device_name":"Node","custom_name":null,
            "has_custom_name":false,"custom_name_updated_at":null,"custom_name_updated_by":null,
            "model_name":"ESP32","ip_address":"10.0.0.2","mac_address":"esp-1","status":"offline",
            "first_seen":"2025-03-01T08:00:00","last_seen":"2025-03-01T09:00:00"}},
            "last_updated":"2025-03-01T09:00:00"}"#,
        )
        .unwrap();
        let loaded = JsonStore::new(path).load().unwrap();
        assert_eq!(loaded["esp-1"].status, DeviceStatus::Offline);
        assert_eq!(loaded["esp-1"].last_seen, at(9));
    }
}
