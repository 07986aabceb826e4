//! Interval driver for the retry scheduler.
//!
//! The reconciliation core is trigger-agnostic; this daemon is the
//! in-process trigger, running one tick per interval until stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::interval;
use tracing::debug;

use crate::services::retry_scheduler::RetryScheduler;

/// Daemon timing configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Interval between reconciliation ticks.
    pub tick_interval: Duration,
    /// Whether to run a tick immediately on startup.
    pub run_on_startup: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(300),
            run_on_startup: true,
        }
    }
}

/// Handle to observe and stop a running [`RetryDaemon`].
#[derive(Clone)]
pub struct DaemonHandle {
    stop_flag: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
}

impl DaemonHandle {
    /// Request the daemon to stop. Takes effect between ticks, never
    /// inside one, so a lock-then-save unit is never interrupted.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    /// Completed ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

/// Runs a [`RetryScheduler`] on a fixed interval.
pub struct RetryDaemon {
    scheduler: Arc<RetryScheduler>,
    config: DaemonConfig,
    stop_flag: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
}

impl RetryDaemon {
    pub fn new(scheduler: Arc<RetryScheduler>, config: DaemonConfig) -> Self {
        Self {
            scheduler,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get a handle to control the daemon.
    pub fn handle(&self) -> DaemonHandle {
        DaemonHandle {
            stop_flag: self.stop_flag.clone(),
            ticks: self.ticks.clone(),
        }
    }

    /// Run a single tick, for the `tick` command and tests.
    pub async fn run_once(&self) {
        self.scheduler.run().await;
        self.ticks.fetch_add(1, Ordering::Release);
    }

    /// Run until stopped.
    pub async fn run(&self) {
        if self.config.run_on_startup {
            self.run_once().await;
        }

        let mut timer = interval(self.config.tick_interval);
        // The first tick of a fresh interval fires immediately; the
        // startup run already covered that.
        timer.tick().await;

        loop {
            timer.tick().await;
            if self.stop_flag.load(Ordering::Acquire) {
                debug!("retry daemon stop requested");
                break;
            }
            self.run_once().await;
        }
    }
}
