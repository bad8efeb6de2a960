//! wifitracker sniffer - Probe request capture
//!
//! Turns raw frames from a monitor-mode interface into `Request` records:
//! - Radiotap header parsing for the antenna signal
//! - 802.11 management header parsing for the transmitter address
//! - Information element decoding for the probed network name

pub mod capture;
pub mod elements;
pub mod frame;

pub use capture::{CaptureError, Sniffer, SnifferConfig};
pub use elements::{decode_probe_body, ProbeBody};
pub use frame::{parse_frame, CapturedProbe, LinkType};
