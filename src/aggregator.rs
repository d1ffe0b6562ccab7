//! Per-poll aggregation of scan lines into device records.
//!
//! Each poll cycle owns a fresh aggregator; duplicate sightings of one MAC
//! within the cycle merge into a single record, and the cycle ends by
//! draining the map into a snapshot. A malformed line is dropped and
//! logged without disturbing the other records.

use crate::advertisement;
use crate::hex::from_hex;
use crate::record::DeviceRecord;
use log::warn;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// Advertisement payloads are capped at 31 bytes, so 62 hex characters.
const MAX_PAYLOAD_HEX_LEN: usize = 62;

/// Aggregates the device-record lines of one poll cycle, keyed by MAC.
#[derive(Debug, Default)]
pub struct PollAggregator {
    devices: BTreeMap<String, DeviceRecord>,
}

impl PollAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one framed line.
    ///
    /// Lines not starting with `MAC:` are ignored; device lines failing
    /// validation (missing fields, unparsable RSSI, odd or oversized hex
    /// payload, a third field that is neither `ADV:` nor `RSP:`) are
    /// skipped with a log entry.
    pub fn push_line(&mut self, line: &str) {
        if !line.starts_with("MAC:") {
            return;
        }

        let mut parts = line.splitn(3, ',');
        let (Some(mac_field), Some(rssi_field), Some(payload_field)) =
            (parts.next(), parts.next(), parts.next())
        else {
            warn!("scan line has fewer than 3 fields: {line}");
            return;
        };

        let Some(mac) = field_value(mac_field) else {
            return;
        };
        let mac = mac.to_ascii_uppercase();

        let rssi: i32 = match field_value(rssi_field).map(str::parse) {
            Some(Ok(value)) => value,
            _ => {
                warn!("invalid RSSI in scan line: {rssi_field}");
                return;
            }
        };

        let is_rsp = match payload_field.split(':').next() {
            Some("ADV") => false,
            Some("RSP") => true,
            _ => {
                warn!("scan line payload is neither ADV nor RSP: {payload_field}");
                return;
            }
        };
        let Some(payload) = field_value(payload_field) else {
            return;
        };
        if payload.len() > MAX_PAYLOAD_HEX_LEN || payload.len() % 2 != 0 {
            warn!(
                "rejecting payload of {} hex chars for {mac}",
                payload.len()
            );
            return;
        }

        let decoded = match advertisement::decode(&from_hex(payload)) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("malformed advertisement from {mac}: {e}");
                None
            }
        };

        let record = self
            .devices
            .entry(mac.clone())
            .or_insert_with(|| DeviceRecord::new(mac, rssi));
        if is_rsp {
            record.rsp_original_hex = Some(payload.to_string());
            record.rsp_decoded = decoded;
        } else {
            record.adv_original_hex = Some(payload.to_string());
            record.adv_decoded = decoded;
        }
        record.rssi = rssi;
        record.timestamp = SystemTime::now();
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// End the cycle, yielding one independently owned record per device.
    pub fn finish(self) -> Vec<DeviceRecord> {
        self.devices.into_values().collect()
    }
}

/// Text after the first `:` of a `NAME:value` field, trimmed.
fn field_value(field: &str) -> Option<&str> {
    field.split_once(':').map(|(_, value)| value.trim())
}
