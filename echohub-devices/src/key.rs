//! Device key selection.
//!
//! Every record is stored under exactly one key, chosen at registration time:
//!
//! 1. a valid hardware MAC address (canonical upper-case form),
//! 2. otherwise a usable client `device_id`,
//! 3. otherwise `temp-` followed by the first 12 hex characters of
//!    SHA-256(`device_name` ++ `model_name`).

use sha2::{Digest, Sha256};

/// Prefix for keys synthesized from name and model.
pub const TEMP_KEY_PREFIX: &str = "temp-";

/// Client ids that mean "no id".
const PLACEHOLDER_IDS: [&str; 2] = ["unknown", "null"];

/// Address prefixes that indicate an IP address was sent where a MAC was expected.
const PRIVATE_IP_PREFIXES: [&str; 3] = ["192.168", "10.", "172."];

/// Whether `mac` is a usable hardware address: six colon-separated
/// two-digit hex octets, not a placeholder, not an IP address.
pub fn is_valid_mac(mac: &str) -> bool {
    let mac = mac.trim();
    if mac.is_empty() || mac.eq_ignore_ascii_case("null") {
        return false;
    }
    if PRIVATE_IP_PREFIXES.iter().any(|p| mac.starts_with(p)) {
        return false;
    }
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Upper-cased, trimmed form of a valid MAC. `None` when the address is not valid.
pub fn canonical_mac(mac: &str) -> Option<String> {
    is_valid_mac(mac).then(|| mac.trim().to_ascii_uppercase())
}

/// Whether a client-supplied `device_id` can serve as a key.
pub fn is_usable_device_id(device_id: &str) -> bool {
    let id = device_id.trim();
    !id.is_empty() && !PLACEHOLDER_IDS.iter().any(|p| id.eq_ignore_ascii_case(p))
}

/// Deterministic fallback key derived from the device's name and model.
pub fn temp_key(device_name: &str, model_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(device_name.as_bytes());
    hasher.update(model_name.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("{TEMP_KEY_PREFIX}{}", &hex[..12])
}

/// Choose the storage key for a registration.
pub fn select_device_key(
    device_id: &str,
    mac_address: Option<&str>,
    device_name: &str,
    model_name: &str,
) -> String {
    if let Some(mac) = mac_address.and_then(canonical_mac) {
        return mac;
    }
    if is_usable_device_id(device_id) {
        return device_id.trim().to_string();
    }
    temp_key(device_name, model_name)
}

/// Normalise a lookup identifier so MACs match regardless of case.
pub(crate) fn lookup_form(identifier: &str) -> String {
    canonical_mac(identifier).unwrap_or_else(|| identifier.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_mac() {
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("a4:cf:12:0b:3e:91"));
        assert!(is_valid_mac(" 00:11:22:33:44:55 "));
    }

    #[test]
    fn rejects_malformed_mac() {
        assert!(!is_valid_mac(""));
        assert!(!is_valid_mac("null"));
        assert!(!is_valid_mac("NULL"));
        assert!(!is_valid_mac("AA:BB:CC:DD:EE"));
        assert!(!is_valid_mac("AA:BB:CC:DD:EE:FF:00"));
        assert!(!is_valid_mac("AA-BB-CC-DD-EE-FF"));
        assert!(!is_valid_mac("GG:BB:CC:DD:EE:FF"));
        assert!(!is_valid_mac("A:BB:CC:DD:EE:FFF"));
    }

    #[test]
    fn rejects_ip_shaped_values() {
        assert!(!is_valid_mac("192.168.1.40"));
        assert!(!is_valid_mac("10.0.0.3"));
        assert!(!is_valid_mac("172.16.0.9"));
    }

    #[test]
    fn canonical_mac_uppercases() {
        assert_eq!(
            canonical_mac("aa:bb:cc:dd:ee:ff").as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
        assert!(canonical_mac("not-a-mac").is_none());
    }

    #[test]
    fn placeholder_ids_are_unusable() {
        assert!(!is_usable_device_id(""));
        assert!(!is_usable_device_id("   "));
        assert!(!is_usable_device_id("unknown"));
        assert!(!is_usable_device_id("null"));
        assert!(is_usable_device_id("esp32-kitchen"));
    }

    #[test]
    fn temp_key_is_deterministic_and_short() {
        let a = temp_key("Kitchen Node", "ESP32");
        let b = temp_key("Kitchen Node", "ESP32");
        assert_eq!(a, b);
        assert!(a.starts_with(TEMP_KEY_PREFIX));
        assert_eq!(a.len(), TEMP_KEY_PREFIX.len() + 12);
        assert!(a[TEMP_KEY_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, temp_key("Kitchen Node", "ESP8266"));
    }

    #[test]
    fn key_priority_mac_then_id_then_temp() {
        assert_eq!(
            select_device_key("esp-1", Some("aa:bb:cc:dd:ee:ff"), "n", "m"),
            "AA:BB:CC:DD:EE:FF"
        );
        assert_eq!(select_device_key("esp-1", Some("null"), "n", "m"), "esp-1");
        assert_eq!(select_device_key("esp-1", None, "n", "m"), "esp-1");
        assert_eq!(
            select_device_key("unknown", Some("10.0.0.1"), "n", "m"),
            temp_key("n", "m")
        );
    }
}
