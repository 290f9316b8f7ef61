//! Conversion of successive counter snapshots into a throughput rate.

use tracing::debug;

use crate::collector::{CollectError, CounterReader, InterfaceSnapshot};

/// Computes the aggregate receive rate (KB/s) between two snapshots.
///
/// Only interfaces present in both snapshots contribute. A counter that went
/// backwards (driver reset, interface re-created) contributes nothing rather
/// than a negative delta.
pub fn rate_between(previous: &InterfaceSnapshot, current: &InterfaceSnapshot) -> Option<f64> {
    let dt = (current.taken_at() - previous.taken_at()).num_microseconds()? as f64 / 1_000_000.0;
    if dt <= 0.0 {
        return None;
    }

    let delta_bytes: u64 = current
        .counters()
        .iter()
        .filter_map(|cur| {
            let prev = previous.rx_bytes(&cur.name)?;
            cur.rx_bytes.checked_sub(prev)
        })
        .sum();

    Some(delta_bytes as f64 / dt / 1024.0)
}

/// Holds the previous snapshot and turns each new one into a rate sample.
#[derive(Debug)]
pub struct RateSampler<R: CounterReader> {
    reader: R,
    previous: Option<InterfaceSnapshot>,
}

impl<R: CounterReader> RateSampler<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            previous: None,
        }
    }

    /// Reads counters and returns the rate since the previous successful read.
    ///
    /// On a read error the previous snapshot is kept, so the next successful
    /// read still yields a delta over the whole gap.
    pub fn sample(&mut self) -> Result<f64, CollectError> {
        let snapshot = self.reader.read_counters()?;
        Ok(self.ingest(snapshot))
    }

    /// Feeds a snapshot and returns the rate in KB/s.
    ///
    /// Returns 0 for the first snapshot after construction or `reset`
    /// (calibration), and when the wall clock did not move forward since the
    /// previous snapshot. The snapshot always becomes the new anchor.
    pub fn ingest(&mut self, snapshot: InterfaceSnapshot) -> f64 {
        let rate = match self.previous.as_ref() {
            None => {
                debug!("calibration sample, {} interfaces", snapshot.counters().len());
                0.0
            }
            Some(previous) => rate_between(previous, &snapshot).unwrap_or_else(|| {
                debug!(
                    "clock went from {} to {}, re-anchoring",
                    previous.taken_at(),
                    snapshot.taken_at()
                );
                0.0
            }),
        };
        self.previous = Some(snapshot);
        rate
    }

    /// Drops the snapshot history; the next sample is a calibration sample.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn is_calibrated(&self) -> bool {
        self.previous.is_some()
    }
}
