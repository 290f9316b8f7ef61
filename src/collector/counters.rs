//! Received-byte counters of the currently active interfaces.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::collector::procfs::parser::{
    is_link_active, parse_carrier, parse_net_dev, parse_operstate,
};
use crate::collector::traits::FileSystem;

/// Loopback carries host-local traffic only and never counts as a link.
const LOOPBACK: &str = "lo";

/// Error returned when interface counters cannot be read.
#[derive(Debug)]
pub enum CollectError {
    /// I/O error reading `/proc/net/dev`.
    Io(std::io::Error),
    /// Malformed `/proc/net/dev` content.
    Parse(String),
    /// No interface is currently up.
    NoActiveInterfaces,
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::NoActiveInterfaces => write!(f, "no active network interfaces"),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Cumulative received bytes of a single interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCounter {
    pub name: String,
    pub rx_bytes: u64,
}

impl InterfaceCounter {
    pub fn new(name: impl Into<String>, rx_bytes: u64) -> Self {
        Self {
            name: name.into(),
            rx_bytes,
        }
    }
}

/// Counters of all active interfaces, captured at one wall-clock instant.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceSnapshot {
    taken_at: DateTime<Utc>,
    counters: Vec<InterfaceCounter>,
}

impl InterfaceSnapshot {
    pub fn new(taken_at: DateTime<Utc>, counters: Vec<InterfaceCounter>) -> Self {
        Self { taken_at, counters }
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn counters(&self) -> &[InterfaceCounter] {
        &self.counters
    }

    /// Looks up the counter of an interface by name.
    pub fn rx_bytes(&self, name: &str) -> Option<u64> {
        self.counters
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.rx_bytes)
    }
}

/// Source of interface counter snapshots.
pub trait CounterReader {
    fn read_counters(&mut self) -> Result<InterfaceSnapshot, CollectError>;
}

/// Reads counters from `/proc/net/dev`, keeping only links that
/// `/sys/class/net/<iface>` reports as active.
#[derive(Debug, Clone)]
pub struct ProcNetCounters<F: FileSystem> {
    fs: F,
    proc_path: String,
    sys_path: String,
}

impl<F: FileSystem> ProcNetCounters<F> {
    /// Creates a new counter reader.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, proc_path: impl Into<String>, sys_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
        }
    }

    /// A link whose sysfs entry cannot be read is treated as down.
    fn is_active(&self, interface: &str) -> bool {
        if interface == LOOPBACK {
            return false;
        }

        let base = format!("{}/class/net/{}", self.sys_path, interface);
        let Ok(operstate) = self
            .fs
            .read_to_string(Path::new(&format!("{}/operstate", base)))
        else {
            return false;
        };
        let carrier = self
            .fs
            .read_to_string(Path::new(&format!("{}/carrier", base)))
            .map(|c| parse_carrier(&c))
            .unwrap_or(false);

        is_link_active(parse_operstate(&operstate), carrier)
    }
}

impl<F: FileSystem> CounterReader for ProcNetCounters<F> {
    fn read_counters(&mut self) -> Result<InterfaceSnapshot, CollectError> {
        let path = format!("{}/net/dev", self.proc_path);
        let content = self.fs.read_to_string(Path::new(&path))?;
        let devices = parse_net_dev(&content).map_err(|e| CollectError::Parse(e.message))?;
        let taken_at = Utc::now();

        let counters: Vec<InterfaceCounter> = devices
            .into_iter()
            .filter(|dev| self.is_active(&dev.interface))
            .map(|dev| InterfaceCounter::new(dev.interface, dev.rx_bytes))
            .collect();

        if counters.is_empty() {
            return Err(CollectError::NoActiveInterfaces);
        }

        trace!("read counters of {} active interfaces", counters.len());
        Ok(InterfaceSnapshot::new(taken_at, counters))
    }
}
