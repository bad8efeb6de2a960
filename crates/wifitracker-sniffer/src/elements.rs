//! Information element decoding for probe request bodies
//!
//! A probe request body is a run of `(id, length, value)` elements. Only the
//! SSID is interpreted; scanning stops at the first vendor-specific element.

use tracing::trace;

/// Element ID of the SSID element
pub const SSID_ELEMENT_ID: u8 = 0;
/// Element ID of a vendor-specific element
pub const VENDOR_SPECIFIC_ELEMENT_ID: u8 = 221;

/// Decoded probe request body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeBody {
    /// Network name, empty for broadcast probes or undecodable bodies
    pub ssid: String,
    /// Raw bytes following the first vendor-specific element's length byte
    pub vendor_specific: Option<Vec<u8>>,
}

/// Decode the elements of a probe request body
///
/// Never reads past the end of `body`: a truncated element ends decoding and
/// whatever was decoded before it is returned.
pub fn decode_probe_body(body: &[u8]) -> ProbeBody {
    let mut probe = ProbeBody::default();
    let mut i = 0usize;

    while i < body.len() {
        let id = body[i];
        i += 1;

        match id {
            SSID_ELEMENT_ID => {
                let Some(&len) = body.get(i) else {
                    trace!(offset = i, "SSID element without length");
                    break;
                };
                i += 1;

                let len = usize::from(len);
                if len > 0 {
                    let Some(value) = body.get(i..i + len) else {
                        trace!(offset = i, len, available = body.len() - i, "Truncated SSID element");
                        break;
                    };
                    probe.ssid = String::from_utf8_lossy(value).into_owned();
                    i += len;
                }
            }
            VENDOR_SPECIFIC_ELEMENT_ID => {
                probe.vendor_specific = body.get(i + 1..).map(<[u8]>::to_vec);
                break;
            }
            _ => {
                let Some(&len) = body.get(i) else {
                    break;
                };
                i += 1 + usize::from(len);
            }
        }
    }

    probe
}
