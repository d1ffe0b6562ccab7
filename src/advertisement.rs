//! BLE Advertising Data (AD) structure decoding.
//!
//! An advertisement or scan-response payload is a sequence of
//! length-prefixed, type-tagged segments (Bluetooth Core Specification
//! "AD structures"). Decoding is all-or-nothing: a segment whose declared
//! length overruns the buffer fails the whole payload so downstream
//! consumers never see silently truncated data.

use crate::hex::to_hex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Error returned when an AD payload cannot be decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdDecodeError {
    /// A segment declared more payload bytes than remain in the buffer.
    #[error("AD segment declares {declared} payload bytes but only {remaining} remain")]
    TruncatedSegment { declared: usize, remaining: usize },
}

/// A decoded AD attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AdValue {
    /// Raw payload rendered as uppercase hex.
    Hex(String),
    /// Payload interpreted as UTF-8 text (device names).
    Text(String),
    /// Single signed byte (TX power level, dBm).
    SignedByte(i8),
    /// Accumulated service-data entries for one UUID, in arrival order.
    HexList(Vec<String>),
}

impl Serialize for AdValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AdValue::Hex(s) | AdValue::Text(s) => serializer.serialize_str(s),
            AdValue::SignedByte(v) => serializer.serialize_i8(*v),
            AdValue::HexList(list) => list.serialize(serializer),
        }
    }
}

/// An insertion-ordered mapping from attribute label to decoded value.
///
/// Labels repeat only for service data, which accumulates into a list;
/// every other repeated type overwrites its earlier value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdStructures {
    entries: Vec<(String, AdValue)>,
}

impl AdStructures {
    pub fn get(&self, label: &str) -> Option<&AdValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == label)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AdValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, label: String, value: AdValue) {
        match self.entries.iter_mut().find(|(key, _)| *key == label) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((label, value)),
        }
    }

    fn append_service_data(&mut self, uuid: String, data_hex: String) {
        let label = format!("Service Data UUID {uuid}");
        match self.entries.iter_mut().find(|(key, _)| *key == label) {
            Some((_, AdValue::HexList(list))) => list.push(data_hex),
            Some((_, other)) => *other = AdValue::HexList(vec![data_hex]),
            None => self.entries.push((label, AdValue::HexList(vec![data_hex]))),
        }
    }
}

impl Serialize for AdStructures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Decode a flat AD payload into its attribute set.
///
/// Cursor loop: one length byte `L` (0 terminates normally), one type byte,
/// then `L - 1` payload bytes. Declared length past the end of the buffer
/// fails the entire payload.
pub fn decode(buffer: &[u8]) -> Result<AdStructures, AdDecodeError> {
    let mut parsed = AdStructures::default();
    let mut offset = 0;

    while offset < buffer.len() {
        let length = buffer[offset] as usize;
        offset += 1;
        if length == 0 {
            break;
        }

        let remaining = buffer.len() - offset;
        // length counts the type byte plus the payload
        if length > remaining {
            return Err(AdDecodeError::TruncatedSegment {
                declared: length.saturating_sub(1),
                remaining: remaining.saturating_sub(1),
            });
        }

        let ad_type = buffer[offset];
        let data = &buffer[offset + 1..offset + length];
        offset += length;

        match ad_type {
            0x01 => parsed.set("Flags".into(), AdValue::Hex(to_hex(data))),
            0x02 | 0x03 => {
                parsed.set("Service UUIDs (16-bit)".into(), AdValue::Hex(to_hex(data)));
            }
            0x04 | 0x05 => {
                parsed.set("Service UUIDs (32-bit)".into(), AdValue::Hex(to_hex(data)));
            }
            0x06 | 0x07 => {
                parsed.set("Service UUIDs (128-bit)".into(), AdValue::Hex(to_hex(data)));
            }
            0x08 | 0x09 => parsed.set(
                "Device Name".into(),
                AdValue::Text(String::from_utf8_lossy(data).into_owned()),
            ),
            0x0A => {
                // empty TX power payloads are skipped, like short service data
                if let Some(&level) = data.first() {
                    parsed.set("TX Power Level".into(), AdValue::SignedByte(level as i8));
                }
            }
            0x16 => {
                if data.len() >= 2 {
                    let uuid = u16::from_le_bytes([data[0], data[1]]);
                    parsed.append_service_data(format!("{uuid:04X}"), to_hex(&data[2..]));
                }
            }
            0x20 => {
                if data.len() >= 4 {
                    let uuid = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
                    parsed.append_service_data(format!("{uuid:08X}"), to_hex(&data[4..]));
                }
            }
            0x21 => {
                if data.len() >= 16 {
                    parsed.append_service_data(to_hex(&data[..16]), to_hex(&data[16..]));
                }
            }
            0xFF => parsed.set("Manufacturer Data".into(), AdValue::Hex(to_hex(data))),
            other => parsed.set(
                format!("Unknown Data ({other})"),
                AdValue::Hex(to_hex(data)),
            ),
        }
    }

    Ok(parsed)
}
