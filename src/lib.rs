//! # ttlcounters - Concurrent Counters with a Sliding TTL
//!
//! ttlcounters is an in-process counter store where every key carries its own
//! time-to-live. Each increment bumps the value and restarts the key's expiry
//! window; keys left alone for longer than the TTL count from 1 again and are
//! eventually reclaimed by a background sweep.
//!
//! Typical uses are rate limiting, login-attempt tracking and other
//! "how many times in the last N seconds" questions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          TtlCounters                            │
//! │                                                                 │
//! │   increment(key) ──> ┌──────────────────────────────────────┐   │
//! │                      │            CounterEngine             │   │
//! │                      │  Mutex<HashMap<Bytes, Arc<Entry>>>   │   │
//! │                      │   ┌───────┐ ┌───────┐ ┌───────┐      │   │
//! │                      │   │ Entry │ │ Entry │ │ Entry │ ...  │   │
//! │                      │   └───────┘ └───────┘ └───────┘      │   │
//! │                      └──────────────────────────────────────┘   │
//! │                                         ▲                       │
//! │                      ┌──────────────────┴───────────────────┐   │
//! │                      │            ExpirySweeper             │   │
//! │                      │        (Background Tokio Task)       │   │
//! │                      └──────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use ttlcounters::TtlCounters;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let attempts = TtlCounters::new(Duration::from_secs(300));
//!
//!     let (count, seen_recently) = attempts.increment("login:alice");
//!     assert_eq!((count, seen_recently), (1, false));
//!
//!     let (count, seen_recently) = attempts.increment("login:alice");
//!     assert_eq!((count, seen_recently), (2, true));
//!
//!     attempts.shutdown().await;
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: entries, the counter engine, the expiry sweeper and configuration
//! - [`store`]: the [`TtlCounters`] store tying the engine to its sweeper
//!
//! ## Design Highlights
//!
//! ### Two-Tier Locking
//!
//! One structural lock guards the key map, so inserts, resets and sweep
//! deletions are serialized and two callers can never both start the same
//! key at 1. Each entry has its own lock so its value and expiry are always
//! read and written as a pair.
//!
//! ### Lazy + Active Expiry
//!
//! Keys are expired in two ways:
//! 1. **Lazy**: `increment` resets an expired key in place
//! 2. **Active**: a background task periodically removes expired keys
//!
//! Both paths use the same expiry predicate. An expired key that has not been
//! swept yet is indistinguishable from an absent one.
//!
//! ### Lifecycle
//!
//! The sweep starts with the store and stops when the store is shut down or
//! dropped. A store must be created inside a Tokio runtime.

pub mod storage;
pub mod store;

// Re-export commonly used types for convenience
pub use storage::{
    ConfigError, CounterEngine, CounterStats, ExpiryConfig, ExpirySweeper, StoreConfig,
};
pub use store::{StoreError, TtlCounters};

/// Version of ttlcounters
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
