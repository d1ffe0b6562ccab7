//! Replay driver backed by a captured scan stream.
//!
//! Feeds previously captured AT scan output (a file or stdin) through the
//! normal poll loop, so the full decode pipeline runs without vendor
//! hardware. Command writes and scan-control primitives succeed as no-ops;
//! end of input raises the shared stop flag so the session winds down
//! through its ordinary cancellation path.

use super::Driver;
use crate::session::StopFlag;
use log::{debug, error};
use std::io::BufRead;

pub struct ReplayDriver<R> {
    source: R,
    stop: StopFlag,
}

impl<R: BufRead + Send> ReplayDriver<R> {
    pub fn new(source: R, stop: StopFlag) -> Self {
        Self { source, stop }
    }
}

impl<R: BufRead + Send> Driver for ReplayDriver<R> {
    fn write(&mut self, bytes: &[u8]) -> i32 {
        debug!("replay driver ignoring {}-byte write", bytes.len());
        0
    }

    fn read_framed(&mut self, max_lines: i32, _timeout_ms: u32) -> (i32, Vec<u8>) {
        let mut chunk = Vec::new();
        for _ in 0..max_lines.max(1) {
            match self.source.read_until(b'\n', &mut chunk) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("replay source read failed: {e}");
                    return (-1, chunk);
                }
            }
        }
        if chunk.is_empty() {
            // capture exhausted; let the session observe the stop flag
            self.stop.stop();
        }
        (0, chunk)
    }

    fn enable_master_primitive(&mut self, enable: bool) -> i32 {
        debug!("replay driver: enable_master({enable})");
        0
    }

    fn cts_control(&mut self) -> i32 {
        0
    }

    fn start_scan_primitive(
        &mut self,
        _mac: &str,
        _name_prefix: &str,
        _rssi: i32,
        _manufacturer_id: &str,
        _data_filter: &str,
    ) -> i32 {
        0
    }

    fn stop_scan_primitive(&mut self) -> i32 {
        0
    }

    fn get_mac_address(&mut self) -> Option<String> {
        None
    }
}
