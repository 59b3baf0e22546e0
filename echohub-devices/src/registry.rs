//! The device registry.
//!
//! A single mutex guards the whole device map; every read takes a snapshot
//! under that lock and every mutation persists while still holding it, so
//! the file on disk always reflects a state some caller observed.
//!
//! Records are never deleted. Status only moves to `offline` through
//! [`DeviceRegistry::update_device_statuses`]; any registration or activity
//! moves it back to `online`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::headers::DeviceHeaders;
use crate::key::{canonical_mac, lookup_form, select_device_key};
use crate::store::JsonStore;
use crate::types::{DeviceRecord, DeviceStatus, RegistrationRequest, RegistryStats};

#[derive(Debug, Default)]
struct RegistryState {
    devices: BTreeMap<String, DeviceRecord>,
    /// Successful `update_last_seen` calls since startup; drives save throttling.
    activity_updates: u64,
}

/// Concurrent, optionally persistent map of device key to [`DeviceRecord`].
pub struct DeviceRegistry {
    state: Mutex<RegistryState>,
    store: Option<JsonStore>,
    clock: Arc<dyn Clock>,
    offline_after: Duration,
    heartbeat_save_every: u64,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("store", &self.store)
            .field("offline_after", &self.offline_after)
            .field("heartbeat_save_every", &self.heartbeat_save_every)
            .finish_non_exhaustive()
    }
}

impl DeviceRegistry {
    /// Create a registry backed by `store` (if any), loading its current
    /// contents. A store that cannot be read is logged and the registry
    /// starts empty.
    pub fn new(config: &RegistryConfig, store: Option<JsonStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with an explicit time source.
    pub fn with_clock(
        config: &RegistryConfig,
        store: Option<JsonStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let devices = match &store {
            Some(store) => match store.load() {
                Ok(devices) => {
                    info!(
                        "loaded {} devices from {}",
                        devices.len(),
                        store.path().display()
                    );
                    devices
                }
                Err(e) => {
                    error!("cannot load device registry, starting empty: {e}");
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };

        let offline_secs = i64::try_from(config.offline_after_secs).unwrap_or(i64::MAX / 1000);
        Self {
            state: Mutex::new(RegistryState {
                devices,
                activity_updates: 0,
            }),
            store,
            clock,
            offline_after: Duration::seconds(offline_secs),
            heartbeat_save_every: u64::from(config.heartbeat_save_every.max(1)),
        }
    }

    /// A registry that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::new(&RegistryConfig::default(), None)
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, devices: &BTreeMap<String, DeviceRecord>, now: NaiveDateTime) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(devices, now) {
                error!("cannot persist device registry: {e}");
            }
        }
    }

    /// Register a device or refresh an existing registration.
    ///
    /// Never fails: an unusable MAC downgrades key selection to the device
    /// id or a name-derived temporary key. Re-registration keeps the custom
    /// name and `first_seen`; `device_type` and `parent_device` are only
    /// overwritten when supplied.
    pub fn register(&self, request: RegistrationRequest) -> DeviceRecord {
        let now = self.clock.now();
        let key = select_device_key(
            &request.device_id,
            request.mac_address.as_deref(),
            &request.device_name,
            &request.model_name,
        );
        let mac_address = request
            .mac_address
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("null"))
            .map(|m| canonical_mac(m).unwrap_or_else(|| m.to_string()))
            .unwrap_or_else(|| key.clone());

        let mut state = self.lock();
        let (record, created) = match state.devices.get_mut(&key) {
            Some(existing) => {
                existing.device_id = request.device_id;
                existing.device_name = request.device_name;
                existing.model_name = request.model_name;
                existing.ip_address = request.ip_address;
                existing.mac_address = mac_address;
                if request.device_type.is_some() {
                    existing.device_type = request.device_type;
                }
                if request.parent_device.is_some() {
                    existing.parent_device = request.parent_device;
                }
                existing.status = DeviceStatus::Online;
                existing.last_seen = now.max(existing.last_seen);
                (existing.clone(), false)
            }
            None => {
                let record = DeviceRecord {
                    device_id: request.device_id,
                    device_name: request.device_name,
                    custom_name: None,
                    has_custom_name: false,
                    custom_name_updated_at: None,
                    custom_name_updated_by: None,
                    model_name: request.model_name,
                    ip_address: request.ip_address,
                    mac_address,
                    status: DeviceStatus::Online,
                    first_seen: now,
                    last_seen: now,
                    parent_device: request.parent_device,
                    device_type: request.device_type,
                };
                state.devices.insert(key.clone(), record.clone());
                (record, true)
            }
        };
        self.persist(&state.devices, now);
        drop(state);

        if created {
            info!(key = %key, name = %record.device_name, "registered new device");
        } else {
            debug!(key = %key, "refreshed device registration");
        }
        record
    }

    /// Refresh `last_seen` and mark online. Looks up by device key first,
    /// then by `device_id`. Returns `false` (with no side effects) when the
    /// device is unknown.
    pub fn update_last_seen(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        let Some(key) = find_key(&state.devices, identifier) else {
            return false;
        };
        if let Some(record) = state.devices.get_mut(&key) {
            record.last_seen = now.max(record.last_seen);
            record.status = DeviceStatus::Online;
        }
        state.activity_updates += 1;
        if state.activity_updates % self.heartbeat_save_every == 0 {
            self.persist(&state.devices, now);
        }
        true
    }

    /// Register a device from its identity headers.
    ///
    /// Returns `None` unless the headers carry a valid MAC or a usable
    /// device id. A missing device id with a MAC becomes `device-<mac>`.
    pub fn auto_register_from_headers(
        &self,
        headers: &DeviceHeaders,
        ip_address: &str,
    ) -> Option<DeviceRecord> {
        if !headers.is_registrable() {
            debug!("headers carry no usable device identity; skipping auto-registration");
            return None;
        }
        let device_id = headers.device_id.clone().unwrap_or_else(|| {
            format!(
                "device-{}",
                headers.mac_address.as_deref().unwrap_or("unknown")
            )
        });
        let request = RegistrationRequest {
            device_id,
            device_name: headers.device_name_or_default().to_string(),
            model_name: headers.model_name_or_default().to_string(),
            ip_address: ip_address.to_string(),
            mac_address: headers.mac_address.clone(),
            device_type: None,
            parent_device: None,
        };
        Some(self.register(request))
    }

    /// Mark every online device whose `last_seen` is older than the offline
    /// threshold as offline. Returns how many records flipped.
    pub fn update_device_statuses(&self) -> usize {
        let now = self.clock.now();
        let cutoff = now - self.offline_after;
        let mut state = self.lock();
        let mut flipped = 0;
        for (key, record) in state.devices.iter_mut() {
            if record.status == DeviceStatus::Online && record.last_seen < cutoff {
                record.status = DeviceStatus::Offline;
                flipped += 1;
                info!(key = %key, "device went offline");
            }
        }
        if flipped > 0 {
            self.persist(&state.devices, now);
        }
        flipped
    }

    /// Assign a user-facing name. `None` when the device is unknown.
    pub fn update_custom_name(
        &self,
        identifier: &str,
        custom_name: &str,
        updated_by: &str,
    ) -> Option<DeviceRecord> {
        let now = self.clock.now();
        let mut state = self.lock();
        let key = find_key(&state.devices, identifier)?;
        let record = state.devices.get_mut(&key)?;
        record.custom_name = Some(custom_name.to_string());
        record.has_custom_name = true;
        record.custom_name_updated_at = Some(now);
        record.custom_name_updated_by = Some(updated_by.to_string());
        let updated = record.clone();
        self.persist(&state.devices, now);
        info!(key = %key, custom_name, updated_by, "custom name set");
        Some(updated)
    }

    /// Remove the user-facing name, resetting all custom-name fields.
    /// `device_name` is left untouched.
    pub fn clear_custom_name(&self, identifier: &str) -> Option<DeviceRecord> {
        let now = self.clock.now();
        let mut state = self.lock();
        let key = find_key(&state.devices, identifier)?;
        let record = state.devices.get_mut(&key)?;
        record.custom_name = None;
        record.has_custom_name = false;
        record.custom_name_updated_at = None;
        record.custom_name_updated_by = None;
        let updated = record.clone();
        self.persist(&state.devices, now);
        info!(key = %key, "custom name cleared");
        Some(updated)
    }

    /// Look up by device key, then by `device_id`.
    pub fn get_device(&self, identifier: &str) -> Option<DeviceRecord> {
        let state = self.lock();
        let key = find_key(&state.devices, identifier)?;
        state.devices.get(&key).cloned()
    }

    /// All devices, most recently seen first (ties by key ascending).
    pub fn get_all(&self) -> Vec<DeviceRecord> {
        self.entries().into_iter().map(|(_, record)| record).collect()
    }

    /// Like [`get_all`](Self::get_all), paired with each device key.
    pub fn entries(&self) -> Vec<(String, DeviceRecord)> {
        let mut entries: Vec<(String, DeviceRecord)> = self
            .lock()
            .devices
            .iter()
            .map(|(k, r)| (k.clone(), r.clone()))
            .collect();
        // BTreeMap iteration is key-ascending and the sort is stable.
        entries.sort_by(|a, b| b.1.last_seen.cmp(&a.1.last_seen));
        entries
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.lock();
        let online = state
            .devices
            .values()
            .filter(|r| r.status == DeviceStatus::Online)
            .count();
        RegistryStats {
            total_devices: state.devices.len(),
            online_devices: online,
            offline_devices: state.devices.len() - online,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().devices.is_empty()
    }

    /// Write the current state regardless of heartbeat throttling.
    /// Called on shutdown so no activity is lost.
    pub fn flush(&self) {
        let now = self.clock.now();
        let state = self.lock();
        if self.store.is_none() {
            warn!("flush requested on an in-memory registry");
            return;
        }
        self.persist(&state.devices, now);
    }
}

/// Resolve an identifier to a device key: exact key (MACs compared
/// case-insensitively), then a scan over `device_id`.
fn find_key(devices: &BTreeMap<String, DeviceRecord>, identifier: &str) -> Option<String> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return None;
    }
    let canonical = lookup_form(trimmed);
    if devices.contains_key(&canonical) {
        return Some(canonical);
    }
    if devices.contains_key(trimmed) {
        return Some(trimmed.to_string());
    }
    devices
        .iter()
        .find(|(_, record)| record.device_id == trimmed)
        .map(|(key, _)| key.clone())
}
