//! Bandwidth monitoring engine.
//!
//! - `sampler`: counter snapshots to KB/s rate
//! - `window`: fixed-capacity FIFO of rate samples
//! - `threshold`: Idle/Monitoring state machine and trigger decision
//! - `service`: session driver on top of the scheduler
//! - `config`: per-session parameters and validation

pub mod config;
pub mod sampler;
pub mod service;
pub mod threshold;
pub mod window;

pub use config::{ConfigError, MonitorConfig};
pub use sampler::RateSampler;
pub use service::{BandwidthMonitor, StatusBoard};
pub use threshold::{MonitorError, MonitorEvent, MonitorState, MonitorStatus, ThresholdMonitor};
pub use window::SlidingWindow;
