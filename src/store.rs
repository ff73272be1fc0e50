//! The TTL Counter Store
//!
//! [`TtlCounters`] ties a [`CounterEngine`] to its [`ExpirySweeper`]: the
//! sweep starts when the store is built and stops when the store is shut
//! down or dropped.

use crate::storage::{
    ConfigError, CounterEngine, CounterStats, ExpiryConfig, ExpirySweeper, StoreConfig,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while building a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configuration was rejected
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// No Tokio runtime was available to host the sweeper
    #[error("a Tokio runtime is required to run the expiry sweeper")]
    NoRuntime,
}

/// Concurrent counters with a per-key sliding TTL.
///
/// Every [`increment`](Self::increment) bumps a key's count and restarts its
/// expiry window. Keys left alone for longer than the TTL behave as if they
/// had never been seen, and a background sweep reclaims their memory.
///
/// # Example
///
/// ```
/// use ttlcounters::TtlCounters;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let counters = TtlCounters::new(Duration::from_secs(60));
///
///     assert_eq!(counters.increment("user:42"), (1, false));
///     assert_eq!(counters.increment("user:42"), (2, true));
///
///     counters.shutdown().await;
/// }
/// ```
#[derive(Debug)]
pub struct TtlCounters {
    engine: Arc<CounterEngine>,
    sweeper: ExpirySweeper,
}

impl TtlCounters {
    /// Creates a store with the given TTL and starts its sweeper.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime. Use
    /// [`with_config`](Self::with_config) to get an error instead.
    pub fn new(ttl: Duration) -> Self {
        match Self::with_config(StoreConfig::new(ttl)) {
            Ok(store) => store,
            Err(e) => panic!("ttlcounters::TtlCounters::new: {e}"),
        }
    }

    /// Creates a store from a full configuration and starts its sweeper.
    pub fn with_config(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(StoreError::NoRuntime);
        }

        let engine = Arc::new(CounterEngine::new(config.ttl));
        let sweeper = ExpirySweeper::start(Arc::clone(&engine), ExpiryConfig::from(&config));

        debug!(
            ttl_ms = config.ttl.as_millis() as u64,
            sweep_interval_ms = sweeper.interval().as_millis() as u64,
            "TTL counter store created"
        );

        Ok(Self { engine, sweeper })
    }

    /// Increments the counter for `key`, restarting its expiry window.
    ///
    /// Returns the new count and whether the key was live before this call.
    /// See [`CounterEngine::increment`].
    pub fn increment(&self, key: impl AsRef<[u8]>) -> (u64, bool) {
        self.engine.increment(key)
    }

    /// Returns the count for a live key without touching it.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        self.engine.get(key)
    }

    /// Checks if a key is live.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.engine.contains(key)
    }

    /// Returns how long a live key has left.
    pub fn remaining_ttl(&self, key: impl AsRef<[u8]>) -> Option<Duration> {
        self.engine.remaining_ttl(key)
    }

    /// Deletes a key, returning its count if it was live.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        self.engine.remove(key)
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.engine.clear();
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.engine.len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    /// Runs one sweep pass now, returning how many entries were reclaimed.
    pub fn cleanup_expired(&self) -> u64 {
        self.engine.cleanup_expired()
    }

    /// Returns store statistics.
    pub fn stats(&self) -> CounterStats {
        self.engine.stats()
    }

    /// The TTL applied to every key.
    pub fn ttl(&self) -> Duration {
        self.engine.ttl()
    }

    /// How often the background sweep runs.
    pub fn sweep_interval(&self) -> Duration {
        self.sweeper.interval()
    }

    /// Returns true while the background sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// The underlying engine, shared with the sweeper.
    pub fn engine(&self) -> &Arc<CounterEngine> {
        &self.engine
    }

    /// Stops the background sweep and waits for it to exit.
    ///
    /// The counters themselves are dropped with the store.
    pub async fn shutdown(self) {
        let Self { engine, sweeper } = self;
        sweeper.shutdown().await;
        info!(keys = engine.len(), "TTL counter store shut down");
    }
}
