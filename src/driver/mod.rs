//! Radio driver abstraction for the AT transceiver.
//!
//! The vendor module is a hardware boundary: a blocking write/read pair
//! plus a handful of scan-control primitives, all reporting C-style status
//! codes (0 = success). This trait mirrors that contract so the engine and
//! scan session can be exercised against fakes, and `replay` provides a
//! backend that feeds captured scan output from any buffered reader.

pub mod replay;

/// Scan filter parameters handed to the start-scan primitive.
///
/// All fields default to empty/zero, meaning "no filtering". The RSSI
/// threshold is stored as a non-negative magnitude and negated at the
/// driver call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFilter {
    pub mac: String,
    pub name_prefix: String,
    pub rssi_threshold: u32,
    pub manufacturer_id: String,
    pub data_filter: String,
}

/// Blocking interface to the AT radio module.
///
/// `read_framed` fills a chunk with up to `timeout_ms` worth of received
/// bytes; status 0 with an empty chunk means "no data within the timeout",
/// not an error. Callers must not interleave engine commands with an
/// active scan read; use is sequential by contract.
pub trait Driver: Send {
    /// Write raw command bytes. 0 on success.
    fn write(&mut self, bytes: &[u8]) -> i32;

    /// Read up to `max_lines` response lines within `timeout_ms`.
    fn read_framed(&mut self, max_lines: i32, timeout_ms: u32) -> (i32, Vec<u8>);

    /// Toggle master/observer mode through the vendor primitive.
    fn enable_master_primitive(&mut self, enable: bool) -> i32;

    /// Stop any beacon activity so manual AT commands can be issued.
    fn cts_control(&mut self) -> i32;

    /// Begin advertising-report delivery with the given filters.
    /// `rssi` is the already-negated threshold.
    fn start_scan_primitive(
        &mut self,
        mac: &str,
        name_prefix: &str,
        rssi: i32,
        manufacturer_id: &str,
        data_filter: &str,
    ) -> i32;

    /// End advertising-report delivery.
    fn stop_scan_primitive(&mut self) -> i32;

    /// MAC address of the local module, if the module reports one.
    fn get_mac_address(&mut self) -> Option<String>;
}
