//! bwmond - sustained low-bandwidth monitor daemon.
//!
//! Samples the active interfaces at a fixed interval and reports once the
//! average received throughput has stayed below the threshold for the
//! configured delay. In testing mode the trigger is only logged; otherwise
//! the optional `--on-trigger` command is run.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use bwmon::collector::{ProcNetCounters, RealFs};
use bwmon::fmt::{format_duration, format_kbps};
use bwmon::monitor::{BandwidthMonitor, MonitorConfig, MonitorEvent, MonitorStatus, StatusBoard};
use bwmon::settings::Settings;

const EXIT_CONFIG_ERROR: u8 = 2;

/// Sustained low-bandwidth monitor daemon.
#[derive(Parser)]
#[command(name = "bwmond", about = "Sustained low-bandwidth monitor", version)]
struct Args {
    /// Average throughput (KB/s) below which bandwidth counts as low.
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Sampling interval in seconds.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Seconds the average must stay below threshold before triggering.
    #[arg(short, long)]
    delay: Option<u64>,

    /// Testing mode: log the trigger but do not run the trigger command.
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    testing: Option<bool>,

    /// Settings file (default: $XDG_CONFIG_HOME/bwmon/settings.json).
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Do not write the effective settings back to the settings file.
    #[arg(long)]
    no_save: bool,

    /// Shell command to run when the trigger fires (ignored in testing mode).
    #[arg(long, value_name = "COMMAND")]
    on_trigger: Option<String>,

    /// Log the current rate and average every N seconds (0 disables).
    #[arg(long, default_value = "1", value_name = "SECS")]
    status_interval: u64,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["bwmond", "bwmon"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads saved settings, falling back to defaults when the file is missing
/// or unreadable.
fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };
    if !path.exists() {
        debug!("No settings file at {}, using defaults", path.display());
        return Settings::default();
    }
    match Settings::load(path) {
        Ok(settings) => {
            info!("Loaded settings from {}", path.display());
            settings
        }
        Err(e) => {
            warn!("Failed to load settings: {}", e);
            Settings::default()
        }
    }
}

/// Command-line values override the settings file.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(interval) = args.interval {
        settings.interval = interval;
    }
    if let Some(delay) = args.delay {
        settings.delay = delay;
    }
    if let Some(testing) = args.testing {
        settings.testing = testing;
    }
}

/// Periodically logs the monitor status from a separate thread.
fn spawn_status_display(
    board: StatusBoard,
    every: Duration,
    running: Arc<AtomicBool>,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }

    let spawned = thread::Builder::new()
        .name("bwmond-status".to_string())
        .spawn(move || {
            let slice = Duration::from_millis(100);
            while running.load(Ordering::SeqCst) {
                let mut remaining = every;
                while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
                    let sleep_time = remaining.min(slice);
                    thread::sleep(sleep_time);
                    remaining = remaining.saturating_sub(sleep_time);
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }
                info!("{}", describe_status(&board.status()));
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Failed to start status display: {}", e);
            None
        }
    }
}

/// Runs the configured trigger command through `sh -c`.
fn run_trigger_command(command: &str) {
    info!("Running trigger command: {}", command);
    match Command::new("sh").arg("-c").arg(command).status() {
        Ok(status) if status.success() => info!("Trigger command finished"),
        Ok(status) => warn!("Trigger command exited with {}", status),
        Err(e) => error!("Failed to run trigger command: {}", e),
    }
}

fn describe_sample(rate: f64, average: f64) -> String {
    format!(
        "Bandwidth: {}, Average: {}",
        format_kbps(rate),
        format_kbps(average)
    )
}

/// Status line for the display thread, marked while a full window is low.
fn describe_status(status: &MonitorStatus) -> String {
    let marker = if status.is_below_threshold() {
        " [below threshold]"
    } else {
        ""
    };
    format!(
        "Current bandwidth: {} (Avg: {}, {}/{} samples){}",
        format_kbps(status.latest_rate),
        format_kbps(status.average),
        status.samples,
        status.samples_required,
        marker
    )
}

fn describe_config(config: &MonitorConfig) -> String {
    format!(
        "threshold={} KB/s, interval={}, delay={} ({} samples){}",
        config.threshold_kbps,
        format_duration(config.interval_secs),
        format_duration(config.delay_secs),
        config.samples_required(),
        if config.testing_mode { ", testing mode" } else { "" }
    )
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);
    info!("bwmond {} starting", env!("CARGO_PKG_VERSION"));

    let settings_path = args.settings.clone().or_else(Settings::default_path);
    let mut settings = load_settings(settings_path.as_deref());
    apply_overrides(&mut settings, &args);

    let config = settings.to_monitor_config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    if !args.no_save
        && let Some(ref path) = settings_path
    {
        match settings.save(path) {
            Ok(()) => debug!("Saved settings to {}", path.display()),
            Err(e) => warn!("Failed to save settings: {}", e),
        }
    }

    info!("Config: {}", describe_config(&config));
    info!("Counters: proc={}, sys={}", args.proc_path, args.sys_path);

    let reader = ProcNetCounters::new(RealFs::new(), &args.proc_path, &args.sys_path);
    let mut monitor = BandwidthMonitor::new(reader);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let events = match monitor.start(config) {
        Ok(events) => events,
        Err(e) => {
            error!("Failed to start monitoring: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let display = spawn_status_display(
        monitor.status_board(),
        Duration::from_secs(args.status_interval),
        running.clone(),
    );

    while running.load(Ordering::SeqCst) {
        match events.recv_timeout(Duration::from_millis(100)) {
            Ok(MonitorEvent::Nominal { rate, average }) => {
                debug!("{}", describe_sample(rate, average));
            }
            Ok(MonitorEvent::BelowThreshold {
                average,
                testing_mode,
            }) => {
                if testing_mode {
                    monitor.stop();
                    info!(
                        "[TEST MODE] Trigger fired at average {}",
                        format_kbps(average)
                    );
                } else if let Some(ref command) = args.on_trigger {
                    run_trigger_command(command);
                } else {
                    warn!("Trigger fired; no --on-trigger command configured");
                }
                break;
            }
            // Already logged by the sampling thread
            Ok(MonitorEvent::Skipped { .. }) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Sampling stopped unexpectedly");
                break;
            }
        }
    }

    info!("Shutting down...");
    monitor.stop();
    running.store(false, Ordering::SeqCst);
    if let Some(handle) = display
        && handle.join().is_err()
    {
        error!("Status display thread panicked");
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
