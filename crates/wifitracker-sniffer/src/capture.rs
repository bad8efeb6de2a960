//! Live probe request capture on a monitor-mode interface

use chrono::Utc;
use pnet::datalink::{self, Channel, DataLinkReceiver, NetworkInterface};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wifitracker_core::pipeline::DEFAULT_QUEUE_CAPACITY;
use wifitracker_core::Request;

use crate::frame::{parse_frame, LinkType};

/// How long a blocking read waits before checking for a closed consumer
const READ_TIMEOUT_MS: u64 = 500;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Network interface not found: {0}")]
    InterfaceNotFound(String),
    #[error("Unsupported datalink channel type on {0}")]
    UnsupportedChannel(String),
    #[error("Failed to open capture on {interface}: {source}")]
    Open {
        interface: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnifferConfig {
    /// Interface to capture on, must already be in monitor mode
    pub interface: String,
    /// Framing of captured packets
    #[serde(default)]
    pub link_type: LinkType,
    /// Capacity of the request queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            interface: "wlan1".to_string(),
            link_type: LinkType::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// An open capture handle
pub struct Sniffer {
    config: SnifferConfig,
    receiver: Box<dyn DataLinkReceiver>,
}

impl Sniffer {
    /// Open a capture on the configured interface
    pub fn open(config: SnifferConfig) -> Result<Self, CaptureError> {
        let interface = find_interface(&config.interface)?;

        let channel_config = datalink::Config {
            read_timeout: Some(Duration::from_millis(READ_TIMEOUT_MS)),
            promiscuous: true,
            ..Default::default()
        };

        let receiver = match datalink::channel(&interface, channel_config) {
            Ok(Channel::Ethernet(_tx, rx)) => rx,
            Ok(_) => return Err(CaptureError::UnsupportedChannel(config.interface.clone())),
            Err(source) => {
                return Err(CaptureError::Open {
                    interface: config.interface.clone(),
                    source,
                })
            }
        };

        info!(
            interface = %config.interface,
            link_type = ?config.link_type,
            "Capture opened"
        );

        Ok(Self { config, receiver })
    }

    /// Capture probe requests until the capture fails or the returned
    /// receiver is dropped
    pub fn sniff(self) -> mpsc::Receiver<Request> {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let Self {
            config,
            mut receiver,
        } = self;

        tokio::task::spawn_blocking(move || {
            let mut frames = 0usize;
            let mut probes = 0usize;

            loop {
                match receiver.next() {
                    Ok(data) => {
                        frames += 1;
                        let Some(probe) = parse_frame(data, config.link_type) else {
                            continue;
                        };
                        if tx.blocking_send(probe.into_request(Utc::now())).is_err() {
                            break;
                        }
                        probes += 1;
                    }
                    Err(e) if e.kind() == ErrorKind::TimedOut => {
                        if tx.is_closed() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(interface = %config.interface, error = %e, "Capture read failed");
                        break;
                    }
                }
            }

            debug!(interface = %config.interface, frames, probes, "Capture stopped");
        });

        rx
    }
}

/// Look up a network interface by name
pub fn find_interface(name: &str) -> Result<NetworkInterface, CaptureError> {
    datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| CaptureError::InterfaceNotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SnifferConfig::default();
        assert_eq!(config.interface, "wlan1");
        assert_eq!(config.link_type, LinkType::Radiotap);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_unknown_interface() {
        let config = SnifferConfig {
            interface: "wt-missing0".to_string(),
            ..Default::default()
        };
        let err = Sniffer::open(config).err().unwrap();
        assert!(matches!(err, CaptureError::InterfaceNotFound(ref name) if name == "wt-missing0"));
    }
}
