//! bwmon - sustained low-bandwidth detection.
//!
//! Samples the received-byte counters of the active network interfaces,
//! keeps a sliding-window average of the throughput and signals once that
//! average has stayed below a threshold for a configured delay.
//!
//! - `collector`: interface counters from `/proc/net/dev` and `/sys/class/net`
//! - `monitor`: rate sampling, sliding window, threshold state machine
//! - `scheduler`: fixed-period tick driver
//! - `settings`: persisted JSON settings
//! - `fmt`: formatting helpers for rates and durations

pub mod collector;
pub mod fmt;
pub mod monitor;
pub mod scheduler;
pub mod settings;
