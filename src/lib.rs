//! `atble-listener` library.
//!
//! Decodes the scan stream of an AT-command BLE transceiver: response lines
//! are reassembled across reads, per-device advertisement records are
//! extracted and their AD structures decoded, and duplicate sightings
//! within one poll merge into a single emitted snapshot.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process
//! exit codes. The core logic lives in [`crate::app`] and below, where it
//! can be tested deterministically with an injected driver.

pub mod advertisement;
pub mod aggregator;
pub mod app;
pub mod driver;
pub mod engine;
pub mod framer;
pub mod hex;
pub mod record;
pub mod session;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{AdDecodeError, AdStructures, AdValue};
pub use aggregator::PollAggregator;
pub use driver::{Driver, ScanFilter};
pub use engine::{AtCommandEngine, AtError, Timing};
pub use framer::LineFramer;
pub use record::DeviceRecord;
pub use session::{ChannelSink, ResultSink, ScanError, ScanSession, StopFlag};
