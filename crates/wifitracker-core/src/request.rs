//! Captured probe request records

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::timestamp::Timestamp;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to decode request record: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A captured IEEE 802.11 probe request
///
/// This is also the wire format of the request log: one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Hardware address of the probing device
    pub source_mac: String,
    /// When the frame was captured
    #[serde(with = "crate::timestamp")]
    pub capture_dts: Timestamp,
    /// Network name probed for, empty for broadcast or undecodable probes
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_ssid: String,
    /// Antenna signal in dBm, 0 when not measured
    #[serde(default, deserialize_with = "null_as_default")]
    pub signal_strength: i32,
}

impl Request {
    /// Serialize to a single wire record (no trailing newline)
    pub fn to_record(&self) -> Result<String, RequestError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Optional fields treat an explicit `null` like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a request from its JSON record
pub fn parse_request(record: &[u8]) -> Result<Request, RequestError> {
    Ok(serde_json::from_slice(record)?)
}
