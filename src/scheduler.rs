//! Fixed-period tick driver on a dedicated worker thread.
//!
//! Ticks run sequentially on one thread, so a tick never overlaps the
//! previous one; if a tick overruns, the ticks it missed are skipped rather
//! than queued. `stop` may be called any number of times, from any thread,
//! including from inside the tick closure through a [`SchedulerHandle`].
//! Once `stop` returns no new tick will start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use tracing::{debug, error};

/// Longest uninterrupted sleep; bounds how long a stop waits for the worker.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Returned by the tick closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    /// Stop the scheduler after this tick.
    Halt,
}

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    /// Held for the whole duration of a tick.
    gate: Mutex<()>,
    worker: OnceLock<ThreadId>,
}

impl Shared {
    fn gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn on_worker_thread(&self) -> bool {
        self.worker.get() == Some(&thread::current().id())
    }
}

/// Cloneable stop switch for one scheduler run.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Prevents any further tick from starting.
    ///
    /// Called from another thread, waits for an in-flight tick to finish.
    /// Called from inside a tick, returns immediately and the worker exits
    /// once the tick returns.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if !self.shared.on_worker_thread() {
            drop(self.shared.gate());
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// Periodic tick driver.
#[derive(Debug, Default)]
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts calling `on_tick` every `interval`, first one interval from now.
    ///
    /// A running schedule is stopped first.
    pub fn start<F>(&mut self, interval: Duration, on_tick: F) -> std::io::Result<SchedulerHandle>
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        self.stop();

        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            ..Default::default()
        });
        let interval = interval.max(MIN_INTERVAL);
        let worker_shared = Arc::clone(&shared);

        let worker = thread::Builder::new()
            .name("bwmon-scheduler".to_string())
            .spawn(move || run_worker(&worker_shared, interval, on_tick))?;

        self.shared = shared;
        self.worker = Some(worker);
        Ok(self.handle())
    }

    /// Stops ticking. Safe to call repeatedly or when never started.
    pub fn stop(&mut self) {
        self.handle().stop();

        if let Some(worker) = self.worker.take() {
            if worker.thread().id() == thread::current().id() {
                // Stopped from inside a tick; the worker exits on its own
                return;
            }
            if worker.join().is_err() {
                error!("scheduler worker panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<F>(shared: &Shared, interval: Duration, mut on_tick: F)
where
    F: FnMut() -> TickControl,
{
    let _ = shared.worker.set(thread::current().id());
    let mut next_tick = Instant::now() + interval;

    loop {
        // Sleep in slices so a stop is noticed quickly
        loop {
            if !shared.running.load(Ordering::SeqCst) {
                return;
            }
            let now = Instant::now();
            if now >= next_tick {
                break;
            }
            thread::sleep((next_tick - now).min(SLEEP_SLICE));
        }

        {
            let _gate = shared.gate();
            if !shared.running.load(Ordering::SeqCst) {
                return;
            }
            if on_tick() == TickControl::Halt {
                shared.running.store(false, Ordering::SeqCst);
                debug!("scheduler halted by tick");
                return;
            }
        }

        next_tick += interval;
        let now = Instant::now();
        if next_tick <= now {
            let missed = (now - next_tick).as_nanos() / interval.as_nanos() + 1;
            debug!("tick overran, skipping {} ticks", missed);
            next_tick += interval * u32::try_from(missed).unwrap_or(u32::MAX);
        }
    }
}
