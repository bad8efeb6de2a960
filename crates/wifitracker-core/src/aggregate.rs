//! Folding request streams into device and station registries
//!
//! Every update touches a single registry entry under the registry lock.
//! Set insertion is idempotent and `last_seen_dts` is a max, so the final
//! registries don't depend on how requests were spread across parsers or in
//! which order they arrive.

use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::device::{Device, DeviceRegistry};
use crate::pipeline::{parse_requests, PipelineConfig};
use crate::request::Request;
use crate::station::{Station, StationRegistry};

/// Owner of the device and station registries for one run
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    devices: Arc<DeviceRegistry>,
    stations: Arc<StationRegistry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume `requests` into the device registry
    ///
    /// Returns the number of requests applied.
    pub async fn devices(&self, mut requests: mpsc::Receiver<Request>) -> usize {
        let mut applied = 0usize;
        while let Some(request) = requests.recv().await {
            self.devices.observe(&request).await;
            applied += 1;
        }
        debug!(requests = applied, "Device aggregation finished");
        applied
    }

    /// Consume `requests` into the station registry
    ///
    /// Returns the number of requests that touched a station.
    pub async fn stations(&self, mut requests: mpsc::Receiver<Request>) -> usize {
        let mut applied = 0usize;
        while let Some(request) = requests.recv().await {
            if self.stations.observe(&request).await {
                applied += 1;
            }
        }
        debug!(requests = applied, "Station aggregation finished");
        applied
    }

    /// Feed one stream into both registries concurrently
    pub async fn all(&self, requests: mpsc::Receiver<Request>, capacity: usize) -> (usize, usize) {
        let (device_rx, station_rx) = tee(requests, capacity);
        tokio::join!(self.devices(device_rx), self.stations(station_rx))
    }

    pub async fn device_snapshot(&self) -> Vec<Device> {
        self.devices.snapshot().await
    }

    pub async fn station_snapshot(&self) -> Vec<Station> {
        self.stations.snapshot().await
    }
}

/// Duplicate a request stream into two bounded queues
pub fn tee(
    mut input: mpsc::Receiver<Request>,
    capacity: usize,
) -> (mpsc::Receiver<Request>, mpsc::Receiver<Request>) {
    let (left_tx, left_rx) = mpsc::channel(capacity.max(1));
    let (right_tx, right_rx) = mpsc::channel(capacity.max(1));

    tokio::spawn(async move {
        while let Some(request) = input.recv().await {
            let left = left_tx.send(request.clone()).await;
            let right = right_tx.send(request).await;
            if left.is_err() && right.is_err() {
                break;
            }
        }
    });

    (left_rx, right_rx)
}

/// Parse `reader` and build the device registry
pub async fn aggregate_devices<R>(reader: R, config: &PipelineConfig) -> Vec<Device>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let aggregator = Aggregator::new();
    let applied = aggregator.devices(parse_requests(reader, config)).await;
    let devices = aggregator.device_snapshot().await;
    info!(requests = applied, devices = devices.len(), "Devices aggregated");
    devices
}

/// Parse `reader` and build the station registry
pub async fn aggregate_stations<R>(reader: R, config: &PipelineConfig) -> Vec<Station>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let aggregator = Aggregator::new();
    let applied = aggregator.stations(parse_requests(reader, config)).await;
    let stations = aggregator.station_snapshot().await;
    info!(requests = applied, stations = stations.len(), "Stations aggregated");
    stations
}

/// Parse `reader` once and build both registries
pub async fn aggregate_all<R>(reader: R, config: &PipelineConfig) -> (Vec<Device>, Vec<Station>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let aggregator = Aggregator::new();
    aggregator
        .all(parse_requests(reader, config), config.capacity())
        .await;
    let devices = aggregator.device_snapshot().await;
    let stations = aggregator.station_snapshot().await;
    info!(
        devices = devices.len(),
        stations = stations.len(),
        "Devices and stations aggregated"
    );
    (devices, stations)
}
