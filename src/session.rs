//! Scan session: the poll loop between the driver and the result sink.
//!
//! One session runs one sequential cycle at a time: read a chunk, frame it
//! into lines, aggregate device records, emit a snapshot, repeat. The
//! per-cycle record map lives on the cycle's stack; nothing is shared
//! across cycles. Cancellation is cooperative through [`StopFlag`],
//! observed at the top of each cycle and inside the engine's retry waits.

use crate::aggregator::PollAggregator;
use crate::driver::{Driver, ScanFilter};
use crate::engine::{AtCommandEngine, AtError, Timing};
use crate::framer::LineFramer;
use crate::record::DeviceRecord;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};

/// Errors that end a scan session before or during its loop.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to enable master mode: {0}")]
    EnableMaster(#[source] AtError),
    #[error("failed to start scan: status {0}")]
    StartScan(i32),
}

/// Shared cooperative stop signal.
///
/// `stop` is sticky: once raised, every current and future wait on
/// [`StopFlag::cancelled`] completes immediately.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Resolve when the flag is raised.
    pub async fn cancelled(&self) {
        loop {
            // register before checking so a concurrent stop() cannot be missed
            let notified = self.inner.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Receives one snapshot per poll cycle with non-empty findings.
pub trait ResultSink: Send {
    fn on_snapshot(&mut self, records: Vec<DeviceRecord>);
}

/// Sink that forwards snapshots into a tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Vec<DeviceRecord>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Vec<DeviceRecord>>) -> Self {
        Self { tx }
    }
}

impl ResultSink for ChannelSink {
    fn on_snapshot(&mut self, records: Vec<DeviceRecord>) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.tx.send(records);
    }
}

/// A running scan against one AT module.
pub struct ScanSession<D> {
    engine: AtCommandEngine<D>,
    filter: ScanFilter,
    framer: LineFramer,
    sink: Option<Box<dyn ResultSink>>,
    stop: StopFlag,
    scanning: bool,
}

impl<D: Driver> ScanSession<D> {
    pub fn new(driver: D, filter: ScanFilter, timing: Timing, stop: StopFlag) -> Self {
        Self {
            engine: AtCommandEngine::new(driver, timing, stop.clone()),
            filter,
            framer: LineFramer::new(),
            sink: None,
            stop,
            scanning: false,
        }
    }

    /// Register the snapshot consumer, replacing any previous one.
    /// Without a sink, snapshots are dropped.
    pub fn set_sink(&mut self, sink: Box<dyn ResultSink>) {
        self.sink = Some(sink);
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn engine_mut(&mut self) -> &mut AtCommandEngine<D> {
        &mut self.engine
    }

    /// Enable master mode, start the scan, and poll until the stop flag is
    /// raised. Returns immediately if the session is already scanning.
    pub async fn run(&mut self) -> Result<(), ScanError> {
        if self.scanning {
            return Ok(());
        }

        self.engine.set_mode(true).map_err(ScanError::EnableMaster)?;

        let filter = self.filter.clone();
        let status = self.engine.driver_mut().start_scan_primitive(
            &filter.mac,
            &filter.name_prefix,
            -(filter.rssi_threshold as i32),
            &filter.manufacturer_id,
            &filter.data_filter,
        );
        if status != 0 {
            return Err(ScanError::StartScan(status));
        }
        self.scanning = true;
        info!("BLE scan started");

        while !self.stop.is_stopped() {
            self.poll_cycle();
            // let the consumer side of the sink make progress
            tokio::task::yield_now().await;
        }

        self.scanning = false;
        let status = self.engine.driver_mut().stop_scan_primitive();
        if status != 0 {
            warn!("stop scan primitive returned status {status}");
        }
        info!("BLE scan stopped");
        Ok(())
    }

    /// One poll: read, frame, aggregate, emit. Transport failures and
    /// timeouts are logged and skipped; the loop carries on.
    fn poll_cycle(&mut self) {
        let (max_lines, timeout_ms) = {
            let timing = self.engine.timing();
            (timing.poll_max_lines, timing.poll_timeout_ms)
        };
        let (status, chunk) = self.engine.driver_mut().read_framed(max_lines, timeout_ms);
        if status != 0 {
            warn!("scan read failed with status {status}");
        }
        debug!("poll read {} bytes", chunk.len());

        let mut aggregator = PollAggregator::new();
        for line in self.framer.push(&chunk) {
            aggregator.push_line(&line);
        }

        if !aggregator.is_empty()
            && let Some(sink) = &mut self.sink
        {
            sink.on_snapshot(aggregator.finish());
        }
    }
}
