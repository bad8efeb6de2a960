//! Radiotap and IEEE 802.11 header parsing for captured probe requests

use serde::{Deserialize, Serialize};
use wifitracker_core::{Request, Timestamp};

use crate::elements::decode_probe_body;

/// Link layer framing of captured packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// 802.11 frames preceded by a radiotap header (monitor mode default)
    #[default]
    Radiotap,
    /// Bare 802.11 frames
    Ieee80211,
}

/// Length of a management frame header without HT control
const MGMT_HEADER_LEN: usize = 24;
/// Length of the optional HT control field
const HT_CONTROL_LEN: usize = 4;
/// Length of the trailing frame check sequence
const FCS_LEN: usize = 4;

const FRAME_TYPE_MGMT: u8 = 0;
const FRAME_SUBTYPE_PROBE_REQ: u8 = 4;

// Radiotap present bits we need to walk to reach the antenna signal
const RADIOTAP_FLAGS: u32 = 1;
const RADIOTAP_DBM_ANTSIGNAL: u32 = 5;
const RADIOTAP_EXT: u32 = 31;
/// Radiotap flags bit: frame includes FCS
const RADIOTAP_F_FCS: u8 = 0x10;

/// (present bit, alignment, size) of the radiotap fields up to the antenna signal
const RADIOTAP_FIELDS: [(u32, usize, usize); 6] = [
    (0, 8, 8), // TSFT
    (1, 1, 1), // flags
    (2, 1, 1), // rate
    (3, 2, 4), // channel
    (4, 1, 2), // FHSS
    (5, 1, 1), // dBm antenna signal
];

/// A probe request extracted from a captured frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedProbe {
    /// Transmitter address (address 2), `aa:bb:cc:dd:ee:ff`
    pub source_mac: String,
    /// Network name probed for, empty for broadcast probes
    pub ssid: String,
    /// Antenna signal in dBm from the radiotap header
    pub signal: Option<i8>,
    pub vendor_specific: Option<Vec<u8>>,
}

impl CapturedProbe {
    /// Stamp the probe with its capture time
    pub fn into_request(self, capture_dts: Timestamp) -> Request {
        Request {
            source_mac: self.source_mac,
            capture_dts,
            target_ssid: self.ssid,
            signal_strength: self.signal.map(i32::from).unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct RadiotapInfo {
    header_len: usize,
    antenna_signal: Option<i8>,
    has_fcs: bool,
}

/// Parse a captured frame, returning `None` for anything that isn't a
/// complete probe request header
pub fn parse_frame(data: &[u8], link_type: LinkType) -> Option<CapturedProbe> {
    let (frame, signal) = match link_type {
        LinkType::Radiotap => {
            let radiotap = parse_radiotap(data)?;
            let end = if radiotap.has_fcs {
                data.len().checked_sub(FCS_LEN)?
            } else {
                data.len()
            };
            (data.get(radiotap.header_len..end)?, radiotap.antenna_signal)
        }
        LinkType::Ieee80211 => (data, None),
    };

    let (source_mac, body) = parse_probe_header(frame)?;
    let decoded = decode_probe_body(body);

    Some(CapturedProbe {
        source_mac,
        ssid: decoded.ssid,
        signal,
        vendor_specific: decoded.vendor_specific,
    })
}

/// Read the radiotap header length, flags and antenna signal
fn parse_radiotap(data: &[u8]) -> Option<RadiotapInfo> {
    // version(1) pad(1) len(2) present(4)
    if data.len() < 8 || data[0] != 0 {
        return None;
    }
    let header_len = usize::from(u16::from_le_bytes([data[2], data[3]]));
    let header = data.get(..header_len)?;
    if header_len < 8 {
        return None;
    }

    let present = read_u32_le(header, 4)?;

    // Skip any extended present bitmaps
    let mut offset = 8;
    let mut word = present;
    while word & (1 << RADIOTAP_EXT) != 0 {
        word = read_u32_le(header, offset)?;
        offset += 4;
    }

    let mut info = RadiotapInfo {
        header_len,
        ..Default::default()
    };

    for (bit, align, size) in RADIOTAP_FIELDS {
        if present & (1 << bit) == 0 {
            continue;
        }
        offset = offset.next_multiple_of(align);
        let Some(field) = header.get(offset..offset + size) else {
            break;
        };
        match bit {
            RADIOTAP_FLAGS => info.has_fcs = field[0] & RADIOTAP_F_FCS != 0,
            RADIOTAP_DBM_ANTSIGNAL => info.antenna_signal = Some(field[0] as i8),
            _ => {}
        }
        offset += size;
    }

    Some(info)
}

/// Check the frame control for a probe request and split off the header
fn parse_probe_header(frame: &[u8]) -> Option<(String, &[u8])> {
    let fc0 = *frame.first()?;
    let fc1 = *frame.get(1)?;

    let version = fc0 & 0x03;
    let frame_type = (fc0 >> 2) & 0x03;
    let subtype = fc0 >> 4;
    if version != 0 || frame_type != FRAME_TYPE_MGMT || subtype != FRAME_SUBTYPE_PROBE_REQ {
        return None;
    }

    // Order bit on a management frame means an HT control field follows
    let header_len = if fc1 & 0x80 != 0 {
        MGMT_HEADER_LEN + HT_CONTROL_LEN
    } else {
        MGMT_HEADER_LEN
    };
    let header = frame.get(..header_len)?;

    Some((format_mac(&header[10..16]), &frame[header_len..]))
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Format a hardware address as lowercase colon-separated hex
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::SSID_ELEMENT_ID;
    use wifitracker_core::parse_capture_dts;

    const SOURCE: [u8; 6] = [0x02, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e];

    fn probe_request(ssid: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x40, 0x00, 0x00, 0x00];
        frame.extend_from_slice(&[0xff; 6]); // addr1: broadcast
        frame.extend_from_slice(&SOURCE); // addr2: transmitter
        frame.extend_from_slice(&[0xff; 6]); // addr3: bssid
        frame.extend_from_slice(&[0x10, 0x00]); // sequence control
        frame.push(SSID_ELEMENT_ID);
        frame.push(ssid.len() as u8);
        frame.extend_from_slice(ssid);
        frame.extend_from_slice(&[1, 2, 0x02, 0x04]);
        frame
    }

    /// Radiotap header with flags, rate, channel and antenna signal
    fn radiotap(flags: u8, signal: i8) -> Vec<u8> {
        let present: u32 = (1 << 1) | (1 << 2) | (1 << 3) | (1 << 5);
        let mut header = vec![0x00, 0x00, 0x00, 0x00];
        header.extend_from_slice(&present.to_le_bytes());
        header.push(flags); // offset 8
        header.push(0x02); // rate, offset 9
        header.extend_from_slice(&[0x85, 0x09, 0xa0, 0x00]); // channel 2437, offset 10
        header.push(signal as u8); // offset 14
        header.push(0x00); // pad
        let len = header.len() as u16;
        header[2..4].copy_from_slice(&len.to_le_bytes());
        header
    }

    #[test]
    fn test_parse_bare_probe_request() {
        let probe = parse_frame(&probe_request(b"test"), LinkType::Ieee80211).unwrap();
        assert_eq!(probe.source_mac, "02:1a:2b:3c:4d:5e");
        assert_eq!(probe.ssid, "test");
        assert_eq!(probe.signal, None);
    }

    #[test]
    fn test_parse_radiotap_signal() {
        let data = [radiotap(0x00, -47), probe_request(b"home")].concat();
        let probe = parse_frame(&data, LinkType::Radiotap).unwrap();
        assert_eq!(probe.signal, Some(-47));
        assert_eq!(probe.ssid, "home");
    }

    #[test]
    fn test_radiotap_fcs_stripped() {
        // An FCS that would decode as a bogus element if left in the body
        let data = [
            radiotap(RADIOTAP_F_FCS, -60),
            probe_request(b"cafe"),
            vec![SSID_ELEMENT_ID, 2, b'x', b'y'],
        ]
        .concat();
        let probe = parse_frame(&data, LinkType::Radiotap).unwrap();
        assert_eq!(probe.ssid, "cafe");
    }

    #[test]
    fn test_radiotap_tsft_alignment() {
        // present: TSFT + antenna signal, with one extended bitmap
        let present: u32 = 1 | (1 << 5) | (1 << RADIOTAP_EXT);
        let mut header = vec![0x00, 0x00, 0x00, 0x00];
        header.extend_from_slice(&present.to_le_bytes());
        header.extend_from_slice(&0u32.to_le_bytes()); // extended bitmap, offset 8
        header.extend_from_slice(&[0u8; 4]); // pad to 8-byte alignment
        header.extend_from_slice(&[0x11; 8]); // TSFT, offset 16
        header.push(0xc4); // -60 dBm, offset 24
        let len = header.len() as u16;
        header[2..4].copy_from_slice(&len.to_le_bytes());

        let info = parse_radiotap(&header).unwrap();
        assert_eq!(info.header_len, 25);
        assert_eq!(info.antenna_signal, Some(-60));
        assert!(!info.has_fcs);
    }

    #[test]
    fn test_non_probe_rejected() {
        let mut beacon = probe_request(b"net");
        beacon[0] = 0x80;
        assert!(parse_frame(&beacon, LinkType::Ieee80211).is_none());

        let mut data_frame = probe_request(b"net");
        data_frame[0] = 0x08;
        assert!(parse_frame(&data_frame, LinkType::Ieee80211).is_none());
    }

    #[test]
    fn test_truncated_frames_rejected() {
        let frame = probe_request(b"net");
        assert!(parse_frame(&frame[..20], LinkType::Ieee80211).is_none());
        assert!(parse_frame(&[], LinkType::Ieee80211).is_none());

        let mut header = radiotap(0, -40);
        header[2] = 0xff; // claims a longer header than captured
        assert!(parse_frame(&[header, frame].concat(), LinkType::Radiotap).is_none());
        assert!(parse_frame(&[0x00, 0x00, 0x08], LinkType::Radiotap).is_none());
    }

    #[test]
    fn test_broadcast_probe_has_empty_ssid() {
        let probe = parse_frame(&probe_request(b""), LinkType::Ieee80211).unwrap();
        assert_eq!(probe.ssid, "");
    }

    #[test]
    fn test_into_request() {
        let data = [radiotap(0x00, -71), probe_request(b"office")].concat();
        let dts = parse_capture_dts("2024-01-01 10:00:00.000000").unwrap();
        let request = parse_frame(&data, LinkType::Radiotap)
            .unwrap()
            .into_request(dts);
        assert_eq!(request.source_mac, "02:1a:2b:3c:4d:5e");
        assert_eq!(request.target_ssid, "office");
        assert_eq!(request.signal_strength, -71);
        assert_eq!(request.capture_dts, dts);
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac(&[0xaa, 0x0b, 0x00, 0xff, 0x10, 0x01]), "aa:0b:00:ff:10:01");
    }
}
