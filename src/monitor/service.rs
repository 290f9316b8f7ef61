//! Monitoring session driver.
//!
//! `BandwidthMonitor` wires a counter reader, a fresh `RateSampler` per
//! session and the shared `ThresholdMonitor` to a `Scheduler`. All sampling
//! and window mutation happen on the scheduler thread; the collaborator
//! receives `MonitorEvent`s over a channel and may read `MonitorStatus`
//! copies at any time through a [`StatusBoard`].

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, warn};

use super::config::MonitorConfig;
use super::sampler::RateSampler;
use super::threshold::{MonitorError, MonitorEvent, MonitorStatus, ThresholdMonitor};
use crate::collector::CounterReader;
use crate::scheduler::{Scheduler, TickControl};

type SharedMonitor = Arc<Mutex<ThresholdMonitor>>;

fn lock(monitor: &SharedMonitor) -> MutexGuard<'_, ThresholdMonitor> {
    // State is consistent between calls, so a poisoned lock is still usable
    monitor.lock().unwrap_or_else(|e| e.into_inner())
}

/// Read-only view of the monitor for display threads.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    monitor: SharedMonitor,
}

impl StatusBoard {
    pub fn status(&self) -> MonitorStatus {
        lock(&self.monitor).status()
    }
}

/// Runs monitoring sessions against a counter source.
pub struct BandwidthMonitor<R> {
    reader: R,
    monitor: SharedMonitor,
    scheduler: Scheduler,
    tick_period: Option<Duration>,
}

impl<R> BandwidthMonitor<R>
where
    R: CounterReader + Clone + Send + 'static,
{
    /// Each session samples through its own clone of `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            monitor: Arc::new(Mutex::new(ThresholdMonitor::new())),
            scheduler: Scheduler::new(),
            tick_period: None,
        }
    }

    /// Ticks at `period` instead of `interval_secs`; window sizing is unchanged.
    #[cfg(test)]
    pub(crate) fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = Some(period);
        self
    }

    /// Starts a new session from a cold state and returns its event stream.
    ///
    /// Any running session is stopped first. An invalid config leaves the
    /// monitor idle and the scheduler stopped.
    pub fn start(&mut self, config: MonitorConfig) -> Result<Receiver<MonitorEvent>, MonitorError> {
        self.stop();

        let period = self.tick_period.unwrap_or_else(|| config.interval());
        lock(&self.monitor).start(config)?;

        let (tx, rx) = mpsc::channel();
        let mut sampler = RateSampler::new(self.reader.clone());
        let monitor = Arc::clone(&self.monitor);

        let started = self
            .scheduler
            .start(period, move || run_tick(&mut sampler, &monitor, &tx));
        if let Err(e) = started {
            error!("failed to spawn scheduler thread: {}", e);
            lock(&self.monitor).stop();
            return Err(MonitorError::Scheduler(e.to_string()));
        }

        Ok(rx)
    }

    /// Halts sampling and clears the session. Safe to call when idle.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        lock(&self.monitor).stop();
    }

    pub fn is_sampling(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn status(&self) -> MonitorStatus {
        lock(&self.monitor).status()
    }

    pub fn status_board(&self) -> StatusBoard {
        StatusBoard {
            monitor: Arc::clone(&self.monitor),
        }
    }
}

/// One sampling cycle. The monitor lock is held only around `record`.
fn run_tick<R: CounterReader>(
    sampler: &mut RateSampler<R>,
    monitor: &SharedMonitor,
    events: &Sender<MonitorEvent>,
) -> TickControl {
    let event = match sampler.sample() {
        Ok(rate) => match lock(monitor).record(rate) {
            Ok(event) => event,
            Err(e @ MonitorError::InvalidRate(_)) => {
                warn!("Skipping sample: {}", e);
                MonitorEvent::Skipped {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                debug!("stopping ticks: {}", e);
                return TickControl::Halt;
            }
        },
        Err(e) => {
            warn!("Skipping sample: {}", e);
            MonitorEvent::Skipped {
                reason: e.to_string(),
            }
        }
    };

    let fired = matches!(event, MonitorEvent::BelowThreshold { .. });
    if events.send(event).is_err() {
        debug!("event receiver dropped, stopping ticks");
        return TickControl::Halt;
    }

    if fired {
        TickControl::Halt
    } else {
        TickControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockInterface;
    use crate::collector::{
        CollectError, InterfaceCounter, InterfaceSnapshot, MockFs, ProcNetCounters,
    };
    use crate::monitor::config::ConfigError;
    use crate::monitor::threshold::MonitorState;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::collections::VecDeque;

    const TICK: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(2);

    /// Replays scripted reads; shared between clones. Runs out into errors.
    #[derive(Clone, Default)]
    struct Scripted {
        reads: Arc<Mutex<VecDeque<Result<InterfaceSnapshot, CollectError>>>>,
    }

    impl Scripted {
        /// One eth0 snapshot per second with the given per-second byte deltas.
        fn with_deltas(deltas: &[u64]) -> Self {
            let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
            let mut total = 0;
            let mut reads = VecDeque::new();
            reads.push_back(Ok(Self::snapshot(base, total)));
            for (i, delta) in deltas.iter().enumerate() {
                total += delta;
                let at = base + TimeDelta::seconds(i as i64 + 1);
                reads.push_back(Ok(Self::snapshot(at, total)));
            }
            Self {
                reads: Arc::new(Mutex::new(reads)),
            }
        }

        fn snapshot(at: DateTime<Utc>, rx_bytes: u64) -> InterfaceSnapshot {
            InterfaceSnapshot::new(at, vec![InterfaceCounter::new("eth0", rx_bytes)])
        }

        fn push(&self, read: Result<InterfaceSnapshot, CollectError>) {
            self.reads.lock().unwrap().push_back(read);
        }
    }

    impl CounterReader for Scripted {
        fn read_counters(&mut self) -> Result<InterfaceSnapshot, CollectError> {
            self.reads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CollectError::NoActiveInterfaces))
        }
    }

    #[test]
    fn test_invalid_config_does_not_start() {
        let mut monitor = BandwidthMonitor::new(Scripted::default()).with_tick_period(TICK);
        let err = monitor
            .start(MonitorConfig::new(0.0, 2, 60))
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Config(ConfigError::NonPositiveThreshold(_))
        ));
        assert!(!monitor.is_sampling());
        assert_eq!(monitor.status().state, MonitorState::Idle);
    }

    #[test]
    fn test_first_event_is_calibration() {
        // Heavy traffic from the start
        let reader = Scripted::with_deltas(&[10 * 1024 * 1024; 5]);
        let mut monitor = BandwidthMonitor::new(reader).with_tick_period(TICK);
        let events = monitor.start(MonitorConfig::new(200.0, 1, 60)).unwrap();

        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal {
                rate: 0.0,
                average: 0.0
            }
        );
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal {
                rate: 10_240.0,
                average: 5_120.0
            }
        );
        monitor.stop();
    }

    #[test]
    fn test_trigger_halts_sampling_and_keeps_status() {
        // 3 samples: calibration 0, then 100 KB/s and 50 KB/s
        let reader = Scripted::with_deltas(&[100 * 1024, 50 * 1024, 1024 * 1024]);
        let mut monitor = BandwidthMonitor::new(reader).with_tick_period(TICK);
        let events = monitor
            .start(MonitorConfig::new(200.0, 1, 3).with_testing_mode(true))
            .unwrap();

        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal { .. }
        ));
        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal { .. }
        ));
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::BelowThreshold {
                average: 50.0,
                testing_mode: true
            }
        );

        // Scheduler halted: channel closes with no further events
        assert!(events.recv_timeout(WAIT).is_err());
        assert!(!monitor.is_sampling());

        let status = monitor.status_board().status();
        assert!(status.fired);
        assert_eq!(status.samples, 3);
        assert_eq!(status.average, 50.0);

        monitor.stop();
        assert_eq!(monitor.status().state, MonitorState::Idle);
        assert_eq!(monitor.status().samples, 0);
    }

    #[test]
    fn test_failed_read_is_skipped() {
        let reader = Scripted::default();
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        reader.push(Ok(Scripted::snapshot(base, 0)));
        reader.push(Err(CollectError::Parse("truncated".to_string())));
        reader.push(Ok(Scripted::snapshot(
            base + TimeDelta::seconds(2),
            4096,
        )));

        let mut monitor = BandwidthMonitor::new(reader).with_tick_period(TICK);
        let events = monitor.start(MonitorConfig::new(1.0, 1, 60)).unwrap();

        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal { rate, .. } if rate == 0.0
        ));
        match events.recv_timeout(WAIT).unwrap() {
            MonitorEvent::Skipped { reason } => assert!(reason.contains("truncated")),
            other => panic!("unexpected event {:?}", other),
        }
        // Delta computed against the snapshot before the failure
        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal { rate, .. } if rate == 2.0
        ));
        monitor.stop();
        assert_eq!(monitor.status().samples, 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut monitor = BandwidthMonitor::new(Scripted::default()).with_tick_period(TICK);
        monitor.stop();
        monitor.stop();
        assert_eq!(monitor.status().state, MonitorState::Idle);

        let _events = monitor.start(MonitorConfig::new(200.0, 1, 60)).unwrap();
        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_sampling());
        assert_eq!(monitor.status(), MonitorStatus::default());
    }

    #[test]
    fn test_restart_recalibrates() {
        let fs = MockFs::typical_host();
        let reader = ProcNetCounters::new(fs.clone(), "/proc", "/sys");
        let mut monitor = BandwidthMonitor::new(reader).with_tick_period(TICK);

        let events = monitor.start(MonitorConfig::new(200.0, 1, 60)).unwrap();
        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal { rate, .. } if rate == 0.0
        ));
        monitor.stop();

        // Traffic while stopped must not leak into the next session
        fs.set_net_dev(&[MockInterface::new("eth0", 50_000_000_000)]);
        let events = monitor.start(MonitorConfig::new(200.0, 1, 60)).unwrap();
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            MonitorEvent::Nominal {
                rate: 0.0,
                average: 0.0
            }
        );
        monitor.stop();
    }

    #[test]
    fn test_dropped_receiver_halts_sampling() {
        let reader = Scripted::with_deltas(&[1024; 100]);
        let mut monitor = BandwidthMonitor::new(reader).with_tick_period(TICK);
        let events = monitor.start(MonitorConfig::new(1.0, 1, 60)).unwrap();
        drop(events);

        std::thread::sleep(Duration::from_millis(200));
        assert!(!monitor.is_sampling());
        monitor.stop();
    }
}
