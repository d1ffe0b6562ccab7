use crate::driver::Driver;
use crate::session::StopFlag;
use std::collections::VecDeque;

/// Scriptable in-memory driver for unit tests.
///
/// Reads pop from `reads` in order; once the script is exhausted, further
/// reads report "no data within timeout" and optionally raise a stop flag
/// so session loops wind down.
#[derive(Debug, Default)]
pub struct FakeDriver {
    pub reads: VecDeque<(i32, Vec<u8>)>,
    pub writes: Vec<Vec<u8>>,
    pub write_status: i32,
    pub cts_status: i32,
    pub master_status: i32,
    pub start_scan_status: i32,
    pub read_calls: usize,
    pub cts_calls: usize,
    pub stop_scan_calls: usize,
    pub master_calls: Vec<bool>,
    pub start_scan_args: Option<(String, String, i32, String, String)>,
    pub stop_when_exhausted: Option<StopFlag>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for FakeDriver {
    fn write(&mut self, bytes: &[u8]) -> i32 {
        if self.write_status == 0 {
            self.writes.push(bytes.to_vec());
        }
        self.write_status
    }

    fn read_framed(&mut self, _max_lines: i32, _timeout_ms: u32) -> (i32, Vec<u8>) {
        self.read_calls += 1;
        match self.reads.pop_front() {
            Some(result) => result,
            None => {
                if let Some(stop) = &self.stop_when_exhausted {
                    stop.stop();
                }
                (0, Vec::new())
            }
        }
    }

    fn enable_master_primitive(&mut self, enable: bool) -> i32 {
        if self.master_status == 0 {
            self.master_calls.push(enable);
        }
        self.master_status
    }

    fn cts_control(&mut self) -> i32 {
        self.cts_calls += 1;
        self.cts_status
    }

    fn start_scan_primitive(
        &mut self,
        mac: &str,
        name_prefix: &str,
        rssi: i32,
        manufacturer_id: &str,
        data_filter: &str,
    ) -> i32 {
        self.start_scan_args = Some((
            mac.to_string(),
            name_prefix.to_string(),
            rssi,
            manufacturer_id.to_string(),
            data_filter.to_string(),
        ));
        self.start_scan_status
    }

    fn stop_scan_primitive(&mut self) -> i32 {
        self.stop_scan_calls += 1;
        0
    }

    fn get_mac_address(&mut self) -> Option<String> {
        Some("00:11:22:33:44:55".to_string())
    }
}
