//! Network interface counter collection for Linux.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ProcNetCounters                 │
//! │  - /proc/net/dev          (rx byte counters) │
//! │  - /sys/class/net/*/operstate, carrier       │
//! └─────────────────────┬────────────────────────┘
//!                       │
//!                ┌──────▼──────┐
//!                │  FileSystem │ (trait)
//!                └──────┬──────┘
//!          ┌────────────┴────────────┐
//!   ┌──────▼──────┐           ┌──────▼──────┐
//!   │   RealFs    │           │   MockFs    │
//!   │   (Linux)   │           │  (Testing)  │
//!   └─────────────┘           └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use bwmon::collector::{CounterReader, MockFs, ProcNetCounters};
//!
//! let fs = MockFs::typical_host();
//! let mut reader = ProcNetCounters::new(fs, "/proc", "/sys");
//! let snapshot = reader.read_counters().unwrap();
//! assert_eq!(snapshot.rx_bytes("eth0"), Some(987_654_321));
//! ```

mod counters;
pub mod mock;
pub mod procfs;
pub mod traits;

pub use counters::{
    CollectError, CounterReader, InterfaceCounter, InterfaceSnapshot, ProcNetCounters,
};
pub use mock::MockFs;
pub use traits::{FileSystem, RealFs};
