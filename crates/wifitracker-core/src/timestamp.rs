//! Fixed-format capture timestamps
//!
//! Records carry their capture time as `YYYY-MM-DD HH:MM:SS.ssssss` in UTC.
//! Parsing is strict: the string must match the pattern byte for byte before
//! it is handed to chrono, since chrono alone would also accept unpadded
//! fields, extra whitespace and other near misses.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

/// Capture timestamp (UTC, microsecond precision on the wire)
pub type Timestamp = DateTime<Utc>;

/// chrono format string matching the wire pattern
pub const CAPTURE_DTS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Byte pattern of a valid timestamp, `d` marks a decimal digit
const PATTERN: &[u8; 26] = b"dddd-dd-dd dd:dd:dd.dddddd";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Timestamp {0:?} does not match YYYY-MM-DD HH:MM:SS.ssssss")]
    Malformed(String),
    #[error("Timestamp {0:?} is out of range")]
    OutOfRange(String),
}

/// Parse a capture timestamp, failing on any deviation from the fixed pattern
pub fn parse_capture_dts(s: &str) -> Result<Timestamp, TimestampError> {
    if !matches_pattern(s.as_bytes()) {
        return Err(TimestampError::Malformed(s.to_string()));
    }

    let naive = NaiveDateTime::parse_from_str(s, CAPTURE_DTS_FORMAT)
        .map_err(|_| TimestampError::OutOfRange(s.to_string()))?;

    // chrono represents a leap second as nanos >= 1s; seconds stop at 59
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(TimestampError::OutOfRange(s.to_string()));
    }

    Ok(naive.and_utc())
}

/// Format a timestamp in the wire pattern (sub-microsecond digits are cut)
pub fn format_capture_dts(ts: &Timestamp) -> String {
    ts.format(CAPTURE_DTS_FORMAT).to_string()
}

fn matches_pattern(bytes: &[u8]) -> bool {
    bytes.len() == PATTERN.len()
        && bytes.iter().zip(PATTERN.iter()).all(|(&b, &p)| match p {
            b'd' => b.is_ascii_digit(),
            literal => b == literal,
        })
}

/// Serde adapter for `#[serde(with = "wifitracker_core::timestamp")]`
pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_capture_dts(ts))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_capture_dts(&s).map_err(serde::de::Error::custom)
}
