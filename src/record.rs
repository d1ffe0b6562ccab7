//! Per-device scan record emitted in poll snapshots.

use crate::advertisement::AdStructures;
use serde::{Serialize, Serializer};
use std::time::{SystemTime, UNIX_EPOCH};

/// One device sighted within a poll cycle.
///
/// A record is created on the first `MAC:` line for an address within a
/// cycle and updated in place by later lines for the same address; records
/// never survive into the next cycle. RSSI and timestamp are refreshed on
/// every accepted line (last write wins); the ADV and RSP sides fill in
/// independently as their lines arrive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    /// Uppercased MAC address text, e.g. `AA:BB:CC:DD:EE:FF`.
    pub mac: String,
    /// Signed RSSI in dBm from the most recent line.
    pub rssi: i32,
    /// Raw hex payload of the last advertisement line, if any was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adv_original_hex: Option<String>,
    /// Decoded advertisement attributes; `None` when the payload was malformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adv_decoded: Option<AdStructures>,
    /// Raw hex payload of the last scan-response line, if any was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsp_original_hex: Option<String>,
    /// Decoded scan-response attributes; `None` when the payload was malformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsp_decoded: Option<AdStructures>,
    /// Capture time of the last update within the poll, as epoch milliseconds.
    #[serde(serialize_with = "serialize_epoch_millis")]
    pub timestamp: SystemTime,
}

impl DeviceRecord {
    pub fn new(mac: String, rssi: i32) -> Self {
        Self {
            mac,
            rssi,
            adv_original_hex: None,
            adv_decoded: None,
            rsp_original_hex: None,
            rsp_decoded: None,
            timestamp: SystemTime::now(),
        }
    }
}

fn serialize_epoch_millis<S: Serializer>(
    time: &SystemTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    serializer.serialize_u64(millis)
}
