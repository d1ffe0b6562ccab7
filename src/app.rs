//! Core application runner (business logic) for `atble-listener`.
//!
//! This module is intentionally decoupled from CLI parsing and process exit
//! codes so it can be tested deterministically with an injected driver and
//! injected output streams.

use crate::driver::{Driver, ScanFilter};
use crate::engine::Timing;
use crate::session::{ChannelSink, ScanError, ScanSession, StopFlag};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Captured scan stream to replay; reads stdin when omitted.
    #[arg(value_name = "CAPTURE")]
    pub replay: Option<PathBuf>,

    /// Only scan the device with this MAC address.
    #[arg(long, default_value = "")]
    pub mac: String,

    /// Only scan devices whose broadcast name starts with this prefix.
    #[arg(long, default_value = "")]
    pub name_prefix: String,

    /// RSSI threshold magnitude in dBm; applied as its negation.
    #[arg(long, default_value_t = 0)]
    pub rssi_threshold: u32,

    /// Manufacturer ID filter (hex text), empty for none.
    #[arg(long, default_value = "")]
    pub manufacturer_id: String,

    /// Raw advertisement data filter, empty for none.
    #[arg(long, default_value = "")]
    pub data_filter: String,

    /// Per-read timeout of one scan poll, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub poll_timeout_ms: u32,
}

impl Options {
    pub fn filter(&self) -> ScanFilter {
        ScanFilter {
            mac: self.mac.clone(),
            name_prefix: self.name_prefix.clone(),
            rssi_threshold: self.rssi_threshold,
            manufacturer_id: self.manufacturer_id.clone(),
            data_filter: self.data_filter.clone(),
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            poll_timeout_ms: self.poll_timeout_ms,
            ..Timing::default()
        }
    }
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("scan worker terminated abnormally: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Run the scan loop, writing one JSON line per device record to `out`
/// and serialization problems to `err`.
///
/// The session runs on its own task and hands snapshots over a channel;
/// this function drains the channel until the session ends (stop flag
/// raised or start failure).
pub async fn run_with_io<D>(
    options: Options,
    driver: D,
    stop: StopFlag,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError>
where
    D: Driver + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ScanSession::new(driver, options.filter(), options.timing(), stop);
    session.set_sink(Box::new(ChannelSink::new(tx)));

    let worker = tokio::spawn(async move { session.run().await });

    while let Some(snapshot) = rx.recv().await {
        for record in &snapshot {
            match serde_json::to_string(record) {
                Ok(line) => writeln!(out, "{line}")?,
                Err(e) => writeln!(err, "failed to serialize record: {e}")?,
            }
        }
    }

    worker.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeDriver;

    fn options() -> Options {
        Options {
            replay: None,
            mac: String::new(),
            name_prefix: String::new(),
            rssi_threshold: 0,
            manufacturer_id: String::new(),
            data_filter: String::new(),
            poll_timeout_ms: 1000,
        }
    }

    #[tokio::test]
    async fn test_run_writes_json_lines() {
        let stop = StopFlag::new();
        let mut driver = FakeDriver::new();
        driver.stop_when_exhausted = Some(stop.clone());
        driver.reads.push_back((
            0,
            b"MAC:AA:BB:CC:DD:EE:FF,RSSI:-45,ADV:0201061107\r\n".to_vec(),
        ));

        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        run_with_io(options(), driver, stop, &mut out, &mut err)
            .await
            .unwrap();

        assert!(err.is_empty());
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains(r#""mac":"AA:BB:CC:DD:EE:FF""#));
        assert!(out.contains(r#""rssi":-45"#));
        assert!(out.contains(r#""adv_original_hex":"0201061107""#));
        assert!(out.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_run_propagates_start_failure() {
        let stop = StopFlag::new();
        let mut driver = FakeDriver::new();
        driver.start_scan_status = -5;

        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        let result = run_with_io(options(), driver, stop, &mut out, &mut err).await;

        assert!(matches!(
            result,
            Err(RunError::Scan(ScanError::StartScan(-5)))
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_filter_reaches_the_driver() {
        let stop = StopFlag::new();
        let mut driver = FakeDriver::new();
        driver.stop_when_exhausted = Some(stop.clone());

        let mut opts = options();
        opts.name_prefix = "mcandle".into();
        opts.rssi_threshold = 80;

        let mut out = Vec::<u8>::new();
        let mut err = Vec::<u8>::new();
        run_with_io(opts, driver, stop, &mut out, &mut err)
            .await
            .unwrap();
        // the driver is consumed by the session; filter plumbing is covered
        // in the session tests, this exercises the Options conversion path
    }

    #[test]
    fn test_options_filter_conversion() {
        let mut opts = options();
        opts.mac = "AA:BB:CC:DD:EE:FF".into();
        opts.rssi_threshold = 70;
        let filter = opts.filter();
        assert_eq!(filter.mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(filter.rssi_threshold, 70);
        assert_eq!(filter.name_prefix, "");
    }

    #[test]
    fn test_options_timing_conversion() {
        let mut opts = options();
        opts.poll_timeout_ms = 250;
        let timing = opts.timing();
        assert_eq!(timing.poll_timeout_ms, 250);
        assert_eq!(timing.retry_backoff, std::time::Duration::from_millis(1000));
    }
}
