//! Low-bandwidth decision state machine.
//!
//! `ThresholdMonitor` is either `Idle` or `Monitoring`. While monitoring it
//! owns the session config and the sliding window; each recorded rate is
//! pushed into the window and the windowed average is compared against the
//! threshold. The trigger fires only once the window holds a full
//! `samples_required` worth of samples, so an under-filled window (for
//! example the zero calibration sample right after start) can never look like
//! sustained low bandwidth.
//!
//! Firing is terminal for the session: further `record` calls are rejected,
//! but the window and average stay readable until `stop` is called.

use tracing::{info, warn};

use super::config::{ConfigError, MonitorConfig};
use super::window::SlidingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorState {
    #[default]
    Idle,
    Monitoring,
}

/// Outcome of one tick, delivered to the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Sample recorded, no trigger.
    Nominal { rate: f64, average: f64 },
    /// The windowed average stayed below threshold for the whole delay.
    /// Emitted at most once per session.
    BelowThreshold { average: f64, testing_mode: bool },
    /// Counters could not be read; nothing was recorded for this tick.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    Config(ConfigError),
    /// `record` called while idle.
    NotMonitoring,
    /// `record` called after the trigger fired.
    AlreadyFired,
    /// Rate sample that is negative, NaN or infinite.
    InvalidRate(f64),
    /// The sampling thread could not be spawned.
    Scheduler(String),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::Config(e) => write!(f, "invalid configuration: {}", e),
            MonitorError::NotMonitoring => write!(f, "monitor is not running"),
            MonitorError::AlreadyFired => write!(f, "trigger already fired for this session"),
            MonitorError::InvalidRate(rate) => write!(f, "invalid rate sample: {}", rate),
            MonitorError::Scheduler(msg) => write!(f, "failed to start sampling: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for MonitorError {
    fn from(e: ConfigError) -> Self {
        MonitorError::Config(e)
    }
}

/// Point-in-time copy of the monitor, for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// Most recent rate sample, KB/s.
    pub latest_rate: f64,
    /// Current windowed average, KB/s.
    pub average: f64,
    /// Samples currently held in the window.
    pub samples: usize,
    pub samples_required: usize,
    pub threshold_kbps: f64,
    pub fired: bool,
}

impl MonitorStatus {
    /// True when a full window averages below threshold.
    pub fn is_below_threshold(&self) -> bool {
        self.state == MonitorState::Monitoring
            && self.samples >= self.samples_required
            && self.average < self.threshold_kbps
    }
}

#[derive(Debug)]
struct Session {
    config: MonitorConfig,
    samples_required: usize,
    window: SlidingWindow,
    latest_rate: f64,
    fired: bool,
}

/// Sliding-window threshold detector.
#[derive(Debug, Default)]
pub struct ThresholdMonitor {
    session: Option<Session>,
}

impl ThresholdMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session from a cold state, replacing any current one.
    ///
    /// An invalid config is rejected and leaves the monitor idle.
    pub fn start(&mut self, config: MonitorConfig) -> Result<(), MonitorError> {
        if let Err(e) = config.validate() {
            self.session = None;
            return Err(e.into());
        }

        let samples_required = config.samples_required();
        info!(
            "Monitoring started. Threshold: {} KB/s, interval: {}s, delay: {}s ({} samples)",
            config.threshold_kbps, config.interval_secs, config.delay_secs, samples_required
        );

        self.session = Some(Session {
            config,
            samples_required,
            window: SlidingWindow::new(samples_required),
            latest_rate: 0.0,
            fired: false,
        });
        Ok(())
    }

    /// Records one rate sample and evaluates the window.
    ///
    /// Rates must be finite and non-negative; anything else is rejected
    /// without touching the window.
    pub fn record(&mut self, rate: f64) -> Result<MonitorEvent, MonitorError> {
        let session = self.session.as_mut().ok_or(MonitorError::NotMonitoring)?;
        if session.fired {
            return Err(MonitorError::AlreadyFired);
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(MonitorError::InvalidRate(rate));
        }

        session.latest_rate = rate;
        session.window.push(rate);
        let average = session.window.average();

        if session.window.len() >= session.samples_required
            && average < session.config.threshold_kbps
        {
            session.fired = true;
            warn!(
                "Bandwidth average {:.0} KB/s below threshold {} KB/s for {}s",
                average, session.config.threshold_kbps, session.config.delay_secs
            );
            return Ok(MonitorEvent::BelowThreshold {
                average,
                testing_mode: session.config.testing_mode,
            });
        }

        Ok(MonitorEvent::Nominal { rate, average })
    }

    /// Returns to idle, dropping the window and config. Safe to call when idle.
    pub fn stop(&mut self) {
        if self.session.take().is_some() {
            info!("Monitoring stopped.");
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.session.is_some() {
            MonitorState::Monitoring
        } else {
            MonitorState::Idle
        }
    }

    pub fn has_fired(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.fired)
    }

    pub fn config(&self) -> Option<&MonitorConfig> {
        self.session.as_ref().map(|s| &s.config)
    }

    pub fn window(&self) -> Option<&SlidingWindow> {
        self.session.as_ref().map(|s| &s.window)
    }

    pub fn status(&self) -> MonitorStatus {
        match &self.session {
            None => MonitorStatus::default(),
            Some(session) => MonitorStatus {
                state: MonitorState::Monitoring,
                latest_rate: session.latest_rate,
                average: session.window.average(),
                samples: session.window.len(),
                samples_required: session.samples_required,
                threshold_kbps: session.config.threshold_kbps,
                fired: session.fired,
            },
        }
    }
}
