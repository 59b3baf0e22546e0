//! # echohub-devices
//!
//! Registry of client devices for the echohub backend.
//!
//! Devices are keyed primarily by hardware MAC address, falling back to the
//! client-reported id and finally to a name-derived temporary key. The
//! registry tracks an online/offline lifecycle driven by activity signals and
//! a periodic sweep, user-assigned display names, and parent/child
//! relationships for Bluetooth accessories.
//!
//! ## Design
//!
//! - One mutex around the whole map; reads return snapshots
//! - Full-state JSON persistence on every mutation, heartbeats throttled
//! - Persistence failures are logged; the registry keeps working in memory
//! - Records are never deleted
//!
//! ```
//! use echohub_devices::{DeviceRegistry, RegistrationRequest};
//!
//! let registry = DeviceRegistry::in_memory();
//! let lamp = registry.register(
//!     RegistrationRequest::new("esp-1", "Lamp", "ESP32", "192.168.1.20")
//!         .with_mac("AA:BB:CC:DD:EE:FF"),
//! );
//! assert_eq!(lamp.mac_address, "AA:BB:CC:DD:EE:FF");
//! assert!(registry.update_last_seen("esp-1"));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod headers;
pub mod key;
pub mod registry;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use headers::DeviceHeaders;
pub use registry::DeviceRegistry;
pub use store::JsonStore;
pub use types::{DeviceRecord, DeviceStatus, RegistrationRequest, RegistryStats};
