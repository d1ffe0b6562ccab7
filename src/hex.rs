//! Hex text conversion for AT scan payloads.
//!
//! The AT dialect carries advertisement payloads as bare uppercase hex with
//! no separators; both the aggregator and the advertisement decoder go
//! through these two functions.

use std::fmt::Write;

/// Render bytes as uppercase hex, two digits per byte, no separators.
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // write! to a String cannot fail
        let _ = write!(out, "{b:02X}");
    }
    out
}

/// Decode pairs of hex digits left to right.
///
/// An odd-length input drops the final unpaired character (truncate-to-even).
/// Non-hex characters go through the digit lookup unchecked and produce an
/// unspecified digit value; callers must pre-validate their input.
pub fn from_hex(text: &str) -> Vec<u8> {
    let digits = text.as_bytes();
    let len = digits.len() & !1;
    let mut out = Vec::with_capacity(len / 2);
    for pair in digits[..len].chunks_exact(2) {
        out.push((digit(pair[0]) << 4) | digit(pair[1]));
    }
    out
}

fn digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}
