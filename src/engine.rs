//! AT command transport: send, bounded-retry receive, mode transitions.
//!
//! Every operation reports failure as a typed error carrying the driver
//! status code; nothing here panics or aborts the process. The caller
//! decides whether a failure ends a mode-transition sequence (it always
//! does) or just skips to the next poll.

use crate::driver::Driver;
use crate::session::StopFlag;
use log::{debug, error};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Response reads are retried this many times before giving up.
pub const RESPONSE_MAX_RETRIES: u32 = 5;

/// Line budget for one AT response read.
const RESPONSE_MAX_LINES: i32 = 10;

/// Errors from the command engine. Each maps back to a driver status code
/// so status-oriented callers lose nothing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtError {
    #[error("driver write failed with status {0}")]
    Write(i32),
    #[error("CTS control failed with status {0}")]
    Control(i32),
    #[error("master mode primitive failed with status {0}")]
    ModePrimitive(i32),
    #[error("command was not acknowledged: {0:?}")]
    NoAck(String),
}

impl AtError {
    pub fn status(&self) -> i32 {
        match self {
            AtError::Write(status) | AtError::Control(status) | AtError::ModePrimitive(status) => {
                *status
            }
            AtError::NoAck(_) => -1,
        }
    }
}

/// Delay and timeout policy. These are policy constants of the AT dialect,
/// not protocol-derived timings; tests swap in shorter ones and drive them
/// through tokio's paused clock.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Pause after a successful command write before a response is read.
    pub send_settle: Duration,
    /// Pause between the steps of the manual mode handshake.
    pub step_settle: Duration,
    /// Pause between response read retries.
    pub retry_backoff: Duration,
    /// Per-read timeout while awaiting a command response.
    pub response_timeout_ms: u32,
    /// Per-read timeout of one scan poll.
    pub poll_timeout_ms: u32,
    /// Line budget of one scan poll read.
    pub poll_max_lines: i32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            send_settle: Duration::from_millis(200),
            step_settle: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(1000),
            response_timeout_ms: 500,
            poll_timeout_ms: 1000,
            poll_max_lines: 20,
        }
    }
}

/// Sends AT commands and sequences mode transitions over one driver handle.
pub struct AtCommandEngine<D> {
    driver: D,
    timing: Timing,
    stop: StopFlag,
    is_master: bool,
}

impl<D: Driver> AtCommandEngine<D> {
    pub fn new(driver: D, timing: Timing, stop: StopFlag) -> Self {
        Self {
            driver,
            timing,
            stop,
            is_master: false,
        }
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Write one command, then hold the settle delay so the module is
    /// ready for a response read. No retry at this layer.
    pub async fn send_command(&mut self, command: &str) -> Result<(), AtError> {
        debug!("sending AT command: {}", command.trim_end());
        let status = self.driver.write(command.as_bytes());
        if status != 0 {
            error!("failed to send AT command: status {status}");
            return Err(AtError::Write(status));
        }
        sleep(self.timing.send_settle).await;
        Ok(())
    }

    /// Read a response, retrying up to [`RESPONSE_MAX_RETRIES`] times with a
    /// fixed backoff between attempts (none after the last). Returns the
    /// first non-empty successful read; an empty string when every attempt
    /// fails or the stop flag interrupts a backoff wait.
    pub async fn receive_response(&mut self, timeout_ms: u32) -> String {
        for attempt in 1..=RESPONSE_MAX_RETRIES {
            let (status, bytes) = self.driver.read_framed(RESPONSE_MAX_LINES, timeout_ms);
            if status == 0 && !bytes.is_empty() {
                let response = String::from_utf8_lossy(&bytes).into_owned();
                debug!("received response (attempt {attempt}): {}", response.trim());
                return response;
            }
            debug!("no response (attempt {attempt}/{RESPONSE_MAX_RETRIES}), status={status}");

            if attempt < RESPONSE_MAX_RETRIES {
                tokio::select! {
                    _ = sleep(self.timing.retry_backoff) => {}
                    _ = self.stop.cancelled() => {
                        debug!("response wait interrupted");
                        return String::new();
                    }
                }
            }
        }
        error!("no AT response after {RESPONSE_MAX_RETRIES} attempts");
        String::new()
    }

    /// Switch master/observer mode through the vendor primitive.
    /// A request for the current mode is a no-op.
    pub fn set_mode(&mut self, enable: bool) -> Result<(), AtError> {
        if self.is_master == enable {
            debug!("already in the requested mode, no changes made");
            return Ok(());
        }
        let status = self.driver.enable_master_primitive(enable);
        if status != 0 {
            error!("master mode primitive failed: status {status}");
            return Err(AtError::ModePrimitive(status));
        }
        self.is_master = enable;
        debug!("master mode updated to {enable}");
        Ok(())
    }

    /// MAC address of the local module, if it reports one.
    pub fn device_mac_address(&mut self) -> Option<String> {
        self.driver.get_mac_address()
    }

    /// Manual mode transition for modules without a working mode primitive:
    /// stop beacon activity, switch observer mode, leave AT mode, re-enter
    /// with the escape sequence. Any failing step aborts the whole sequence
    /// and leaves the mode flag unchanged.
    pub async fn set_mode_manual(&mut self, enable: bool) -> Result<(), AtError> {
        if self.is_master == enable {
            debug!("already in the requested mode, no changes made");
            return Ok(());
        }

        let status = self.driver.cts_control();
        if status != 0 {
            error!("CTS control failed: status {status}");
            return Err(AtError::Control(status));
        }
        sleep(self.timing.step_settle).await;

        let observer = if enable {
            "AT+OBSERVER=0\r\n"
        } else {
            "AT+OBSERVER=1\r\n"
        };
        self.send_command(observer).await?;
        sleep(self.timing.step_settle).await;

        let timeout_ms = self.timing.response_timeout_ms;
        let response = self.receive_response(timeout_ms).await;
        debug!("OBSERVER response: {}", response.trim());
        if !response.contains("OK") {
            error!("OBSERVER command did not return OK");
            return Err(AtError::NoAck(response));
        }

        self.send_command("AT+EXIT\r\n").await?;
        let response = self.receive_response(timeout_ms).await;
        debug!("EXIT response: {}", response.trim());

        self.send_command("+++").await?;
        sleep(self.timing.step_settle).await;

        self.is_master = enable;
        debug!("master mode updated to {enable} via manual AT commands");
        Ok(())
    }
}
