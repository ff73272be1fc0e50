//! Background Expiry Sweeper
//!
//! This module implements a background task that periodically removes
//! expired counters from a [`CounterEngine`]. This is "active expiry", as
//! opposed to the lazy reset that [`CounterEngine::increment`] performs on
//! access.
//!
//! ## Why Do We Need This?
//!
//! Lazy expiry keeps `increment` correct on its own, but a key that is
//! incremented once and never touched again would stay in memory forever.
//! The sweeper only reclaims memory; it never changes what a caller observes.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Waits one interval (the TTL, floored at 1 second by default)
//! 2. Takes the structural lock and drops every expired entry
//! 3. Logs how many entries were reclaimed
//!
//! The task runs until its [`ExpirySweeper`] handle is stopped or dropped.

use crate::storage::config::{StoreConfig, DEFAULT_MIN_SWEEP_INTERVAL};
use crate::storage::CounterEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryConfig {
    /// Interval between sweeps
    pub interval: Duration,
}

impl ExpiryConfig {
    /// Sweeps every `ttl`, but no more often than every `floor`.
    pub fn for_ttl(ttl: Duration, floor: Duration) -> Self {
        Self {
            interval: ttl.max(floor),
        }
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MIN_SWEEP_INTERVAL,
        }
    }
}

impl From<&StoreConfig> for ExpiryConfig {
    fn from(config: &StoreConfig) -> Self {
        Self::for_ttl(config.ttl, config.min_sweep_interval)
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,

    /// The sweeper task
    task: Option<JoinHandle<()>>,

    interval: Duration,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime, or if `config.interval`
    /// is zero.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ttlcounters::storage::{CounterEngine, ExpiryConfig, ExpirySweeper};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let engine = Arc::new(CounterEngine::new(Duration::from_secs(5)));
    ///     let sweeper = ExpirySweeper::start(Arc::clone(&engine), ExpiryConfig::default());
    ///
    ///     // Sweeper runs in the background...
    ///
    ///     sweeper.shutdown().await;
    /// }
    /// ```
    pub fn start(engine: Arc<CounterEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(sweeper_loop(engine, config.interval, shutdown_rx));

        info!(
            interval_ms = config.interval.as_millis() as u64,
            "Background expiry sweeper started"
        );

        Self {
            shutdown_tx,
            task: Some(task),
            interval: config.interval,
        }
    }

    /// The interval between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the sweeper task is still alive.
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Signals the sweeper to stop without waiting for it.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        // send_replace succeeds even if the task has already exited
        if !self.shutdown_tx.send_replace(true) {
            info!("Background expiry sweeper stopped");
        }
    }

    /// Stops the sweeper and waits for the task to finish.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "Expiry sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    engine: Arc<CounterEngine>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; wait a full interval instead
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let reclaimed = engine.cleanup_expired();

        if reclaimed > 0 {
            debug!(
                reclaimed = reclaimed,
                keys_remaining = engine.len(),
                "Expired counters cleaned up"
            );
        } else {
            trace!("Expiry sweep found nothing to reclaim");
        }
    }
}
