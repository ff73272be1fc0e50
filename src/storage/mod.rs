//! Storage Module
//!
//! This module provides the core counter storage for ttlcounters: a
//! thread-safe map of counters with sliding TTLs and a background sweeper
//! that reclaims expired ones.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CounterEngine                           │
//! │        Mutex<HashMap<Bytes, Arc<Entry>>>                    │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Entry   │ │ Entry   │ │ Entry   │ │ ...     │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │         │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use ttlcounters::storage::CounterEngine;
//! use std::time::Duration;
//!
//! let engine = CounterEngine::new(Duration::from_secs(60));
//!
//! assert_eq!(engine.increment("requests:10.0.0.1"), (1, false));
//! assert_eq!(engine.increment("requests:10.0.0.1"), (2, true));
//!
//! // Manual sweep (normally done by the ExpirySweeper)
//! assert_eq!(engine.cleanup_expired(), 0);
//! ```

pub mod config;
pub mod engine;
pub mod entry;
pub mod expiry;

// Re-export commonly used types
pub use config::{ConfigError, StoreConfig, DEFAULT_MIN_SWEEP_INTERVAL};
pub use engine::{CounterEngine, CounterStats};
pub use entry::Entry;
pub use expiry::{ExpiryConfig, ExpirySweeper};
