//! wifitracker core - Probe request pipeline and registries
//!
//! This crate turns a log of captured IEEE 802.11 probe requests into two
//! views of wireless activity:
//! - Devices, keyed by hardware address, with the networks they probed for
//! - Stations, keyed by network name, with the devices that probed for them
//!
//! Records are read line by line, parsed by a pool of workers, merged into a
//! single stream and folded into the registries.

pub mod aggregate;
pub mod device;
pub mod pipeline;
pub mod request;
pub mod set;
pub mod source;
pub mod station;
pub mod timestamp;

pub use aggregate::{aggregate_all, aggregate_devices, aggregate_stations, Aggregator};
pub use device::{Device, DeviceRegistry};
pub use pipeline::{merge, parse_records, parse_requests, spawn_parsers, PipelineConfig};
pub use request::{parse_request, Request, RequestError};
pub use set::Set;
pub use source::{open_source, read_records, read_records_from_path, SourceError};
pub use station::{Station, StationRegistry};
pub use timestamp::{format_capture_dts, parse_capture_dts, Timestamp, TimestampError};
