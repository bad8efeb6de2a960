//! Client devices observed probing for networks

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::trace;

use crate::request::Request;
use crate::set::Set;
use crate::timestamp::Timestamp;

/// An IEEE 802.11 device which was actively scanning for access points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Hardware address, unique per registry
    pub device_mac: String,
    /// User-assigned display name
    pub alias: Option<String>,
    /// Network names this device has probed for
    pub known_ssids: Set,
    /// Latest capture time seen for this device
    #[serde(with = "crate::timestamp")]
    pub last_seen_dts: Timestamp,
    /// Vendor lookup results (not populated by the tracker itself)
    pub vendor_company: Option<String>,
    pub vendor_country: Option<String>,
}

impl Device {
    /// Create a device from its first observed request
    pub fn new(request: &Request) -> Self {
        let mut known_ssids = Set::new();
        known_ssids.add(&request.target_ssid);
        Self {
            device_mac: request.source_mac.clone(),
            alias: None,
            known_ssids,
            last_seen_dts: request.capture_dts,
            vendor_company: None,
            vendor_country: None,
        }
    }

    /// Fold a later request into this device
    ///
    /// Requests may arrive in any order, so `last_seen_dts` only ever moves
    /// forward.
    pub fn observe(&mut self, request: &Request) {
        if self.last_seen_dts < request.capture_dts {
            self.last_seen_dts = request.capture_dts;
        }
        self.known_ssids.add(&request.target_ssid);
    }
}

/// Devices keyed by hardware address
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one request as a single read-modify-write on its device
    pub async fn observe(&self, request: &Request) {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&request.source_mac) {
            Some(device) => device.observe(request),
            None => {
                trace!(mac = %request.source_mac, "New device");
                devices.insert(request.source_mac.clone(), Device::new(request));
            }
        }
    }

    /// Get a specific device
    pub async fn get(&self, mac: &str) -> Option<Device> {
        self.devices.read().await.get(mac).cloned()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Read-only copy of all devices, sorted by hardware address
    pub async fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| a.device_mac.cmp(&b.device_mac));
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::parse_capture_dts;

    fn request(mac: &str, dts: &str, ssid: &str) -> Request {
        Request {
            source_mac: mac.to_string(),
            capture_dts: parse_capture_dts(dts).unwrap(),
            target_ssid: ssid.to_string(),
            signal_strength: 0,
        }
    }

    #[test]
    fn test_device_creation() {
        let device = Device::new(&request("aa:aa", "2024-01-01 10:00:00.000000", "home"));
        assert_eq!(device.device_mac, "aa:aa");
        assert!(device.known_ssids.contains("home"));
        assert!(device.alias.is_none());
    }

    #[test]
    fn test_last_seen_never_moves_back() {
        let mut device = Device::new(&request("aa:aa", "2024-01-01 10:00:05.000000", "a"));
        device.observe(&request("aa:aa", "2024-01-01 10:00:01.000000", "b"));
        assert_eq!(
            device.last_seen_dts,
            parse_capture_dts("2024-01-01 10:00:05.000000").unwrap()
        );
        assert_eq!(device.known_ssids.len(), 2);
    }

    #[test]
    fn test_serialize_device() {
        let device = Device::new(&request("aa:aa", "2024-01-01 10:00:05.000000", ""));
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["device_mac"], "aa:aa");
        assert_eq!(json["last_seen_dts"], "2024-01-01 10:00:05.000000");
        assert_eq!(json["known_ssids"], serde_json::json!([]));
        assert!(json["alias"].is_null());
        assert!(json["vendor_company"].is_null());
    }

    #[tokio::test]
    async fn test_registry_last_seen_is_max() {
        let registry = DeviceRegistry::new();
        for dts in [
            "2024-01-01 10:00:03.000000",
            "2024-01-01 10:00:09.000000",
            "2024-01-01 10:00:01.000000",
        ] {
            registry.observe(&request("aa:aa", dts, "home")).await;
        }

        let device = registry.get("aa:aa").await.unwrap();
        assert_eq!(
            device.last_seen_dts,
            parse_capture_dts("2024-01-01 10:00:09.000000").unwrap()
        );
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_registry_snapshot_sorted() {
        let registry = DeviceRegistry::new();
        registry.observe(&request("cc", "2024-01-01 10:00:00.000000", "")).await;
        registry.observe(&request("aa", "2024-01-01 10:00:00.000000", "")).await;
        registry.observe(&request("bb", "2024-01-01 10:00:00.000000", "")).await;

        let macs: Vec<String> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|d| d.device_mac)
            .collect();
        assert_eq!(macs, ["aa", "bb", "cc"]);
    }
}
