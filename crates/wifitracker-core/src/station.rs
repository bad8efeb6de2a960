//! Access points, identified by the network names devices probe for

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::trace;

use crate::request::Request;
use crate::set::Set;

/// An IEEE 802.11 access point
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Station {
    /// Network name, unique per registry
    pub ssid: String,
    /// Hardware addresses of devices that probed for this network
    pub known_devices: Set,
}

impl Station {
    pub fn new(ssid: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            known_devices: Set::new(),
        }
    }
}

/// Stations keyed by network name
#[derive(Debug, Default)]
pub struct StationRegistry {
    stations: RwLock<HashMap<String, Station>>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one request as a single read-modify-write on its station
    ///
    /// Requests without a network name can't be attributed to a station and
    /// are skipped. Returns false in that case.
    pub async fn observe(&self, request: &Request) -> bool {
        if request.target_ssid.is_empty() {
            return false;
        }

        let mut stations = self.stations.write().await;
        let station = stations
            .entry(request.target_ssid.clone())
            .or_insert_with(|| {
                trace!(ssid = %request.target_ssid, "New station");
                Station::new(&request.target_ssid)
            });
        station.known_devices.add(&request.source_mac);
        true
    }

    /// Get a specific station
    pub async fn get(&self, ssid: &str) -> Option<Station> {
        self.stations.read().await.get(ssid).cloned()
    }

    pub async fn len(&self) -> usize {
        self.stations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stations.read().await.is_empty()
    }

    /// Read-only copy of all stations, sorted by network name
    pub async fn snapshot(&self) -> Vec<Station> {
        let mut stations: Vec<Station> = self.stations.read().await.values().cloned().collect();
        stations.sort_by(|a, b| a.ssid.cmp(&b.ssid));
        stations
    }
}
