//! Thread-Safe Counter Engine with Sliding Expiry
//!
//! This module implements the lookup/increment half of the store: a map from
//! key to [`Entry`] behind one structural lock.
//!
//! ## Design Decisions
//!
//! 1. **One Structural Lock**: Inserting, resetting and deleting keys all go
//!    through a single `Mutex`, so two callers racing on a brand-new key can
//!    never both believe they are first.
//! 2. **Per-Entry Lock**: Each [`Entry`] guards its own value and expiry.
//!    Read-side operations clone the entry's `Arc` and release the structural
//!    lock before inspecting it.
//! 3. **Lazy Expiry**: An expired entry found on access is reset in place and
//!    reported exactly like an absent key.
//! 4. **Active Expiry**: [`cleanup_expired`](CounterEngine::cleanup_expired)
//!    is the memory-reclamation pass driven by the
//!    [`ExpirySweeper`](super::ExpirySweeper).
//!
//! ## Locking Model
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   CounterEngine                      │
//! │   Mutex<HashMap<Bytes, Arc<Entry>>>  (structural)    │
//! │                                                      │
//! │   ┌────────────┐ ┌────────────┐ ┌────────────┐       │
//! │   │ Entry "a"  │ │ Entry "b"  │ │ Entry "c"  │  ...  │
//! │   │  RwLock    │ │  RwLock    │ │  RwLock    │       │
//! │   └────────────┘ └────────────┘ └────────────┘       │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Lock order is always structural, then entry. Nothing takes the structural
//! lock while holding an entry lock.

use crate::storage::Entry;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// The counter map.
///
/// This struct is designed to be wrapped in an `Arc` and shared between the
/// callers and the background sweeper. All operations are thread-safe.
///
/// # Capacity
///
/// The engine does not bound its key space. Keys that are incremented once
/// and abandoned occupy memory until the next sweep; callers that accept
/// keys from untrusted input should bound the key space or keep the TTL
/// short.
///
/// # Example
///
/// ```
/// use ttlcounters::storage::CounterEngine;
/// use std::time::Duration;
///
/// let engine = CounterEngine::new(Duration::from_secs(60));
///
/// assert_eq!(engine.increment("login:alice"), (1, false));
/// assert_eq!(engine.increment("login:alice"), (2, true));
/// assert_eq!(engine.get("login:alice"), Some(2));
/// ```
pub struct CounterEngine {
    /// Expiry window applied to every key
    ttl: Duration,

    /// Key -> entry. The mutex is the structural lock.
    entries: Mutex<HashMap<Bytes, Arc<Entry>>>,

    /// Statistics: total increment calls
    increment_count: AtomicU64,

    /// Statistics: increments that started a count at 1
    fresh_count: AtomicU64,

    /// Statistics: fresh starts that reused an expired entry
    reset_count: AtomicU64,

    /// Statistics: entries removed by sweeps
    reclaimed_count: AtomicU64,

    /// Statistics: completed sweep passes
    sweep_count: AtomicU64,
}

impl std::fmt::Debug for CounterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterEngine")
            .field("ttl", &self.ttl)
            .field("keys", &self.len())
            .field("increments", &self.increment_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl CounterEngine {
    /// Creates an empty engine applying `ttl` to every key.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            increment_count: AtomicU64::new(0),
            fresh_count: AtomicU64::new(0),
            reset_count: AtomicU64::new(0),
            reclaimed_count: AtomicU64::new(0),
            sweep_count: AtomicU64::new(0),
        }
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Acquires the structural lock.
    ///
    /// No operation leaves the map half-updated, so a poisoned lock is safe
    /// to keep using.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, Arc<Entry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up the entry for a key, releasing the structural lock before
    /// returning.
    #[inline]
    fn entry(&self, key: &[u8]) -> Option<Arc<Entry>> {
        self.lock().get(key).cloned()
    }

    /// Increments the counter for `key` and extends its expiry.
    ///
    /// Returns the new value and whether the key was found live:
    ///
    /// - absent key: the count starts at 1, returns `(1, false)`
    /// - expired key: the entry is reset in place, returns `(1, false)`
    /// - live key: returns `(previous + 1, true)`
    ///
    /// The structural lock is held for the whole call, so increments on the
    /// same key are totally ordered.
    pub fn increment(&self, key: impl AsRef<[u8]>) -> (u64, bool) {
        let key = key.as_ref();
        self.increment_count.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.lock();

        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                self.fresh_count.fetch_add(1, Ordering::Relaxed);
                self.reset_count.fetch_add(1, Ordering::Relaxed);
                return (entry.restart(self.ttl), false);
            }
            return (entry.bump(self.ttl), true);
        }

        entries.insert(Bytes::copy_from_slice(key), Arc::new(Entry::fresh(self.ttl)));
        self.fresh_count.fetch_add(1, Ordering::Relaxed);

        (1, false)
    }

    /// Returns the current count for a live key without extending its expiry.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        self.entry(key.as_ref()).and_then(|entry| entry.live_value())
    }

    /// Checks if a key exists and is not expired.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.entry(key.as_ref())
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Returns how long a live key has left before it expires.
    pub fn remaining_ttl(&self, key: impl AsRef<[u8]>) -> Option<Duration> {
        self.entry(key.as_ref()).and_then(|entry| entry.remaining())
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// The key's count if it was live, `None` if it was absent or expired.
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        let removed = self.lock().remove(key.as_ref());
        removed.and_then(|entry| entry.live_value())
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns the number of entries held, including expired entries that
    /// have not been swept yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of entries that are not expired.
    pub fn live_len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    /// Removes every expired entry.
    ///
    /// This is called by the background expiry sweeper. The structural lock
    /// is held for the whole pass.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were removed.
    pub fn cleanup_expired(&self) -> u64 {
        let removed = {
            let mut entries = self.lock();
            let before = entries.len();
            let now = Instant::now();

            entries.retain(|_, entry| !entry.is_expired_at(now));

            (before - entries.len()) as u64
        };

        self.sweep_count.fetch_add(1, Ordering::Relaxed);
        if removed > 0 {
            self.reclaimed_count.fetch_add(removed, Ordering::Relaxed);
        }

        removed
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> CounterStats {
        CounterStats {
            keys: self.len() as u64,
            increments: self.increment_count.load(Ordering::Relaxed),
            fresh_starts: self.fresh_count.load(Ordering::Relaxed),
            expired_resets: self.reset_count.load(Ordering::Relaxed),
            reclaimed: self.reclaimed_count.load(Ordering::Relaxed),
            sweeps: self.sweep_count.load(Ordering::Relaxed),
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterStats {
    /// Entries currently held (live or awaiting a sweep)
    pub keys: u64,
    /// Total increment calls
    pub increments: u64,
    /// Increments that returned `found_live = false`
    pub fresh_starts: u64,
    /// Fresh starts that reused an expired entry
    pub expired_resets: u64,
    /// Entries removed by sweeps
    pub reclaimed: u64,
    /// Sweep passes run
    pub sweeps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_fresh_key() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        assert_eq!(engine.increment("mykey"), (1, false));
        assert_eq!(engine.increment("other"), (1, false));
    }

    #[test]
    fn test_live_reincrement() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        assert_eq!(engine.increment("mykey"), (1, false));
        for n in 2..=10 {
            assert_eq!(engine.increment("mykey"), (n, true));
        }
    }

    #[test]
    fn test_expire_and_increment() {
        let engine = CounterEngine::new(Duration::from_millis(50));

        assert_eq!(engine.increment("k"), (1, false));
        assert_eq!(engine.increment("k"), (2, true));

        thread::sleep(Duration::from_millis(60));

        assert_eq!(engine.increment("k"), (1, false));
        assert_eq!(engine.increment("k"), (2, true));
    }

    #[test]
    fn test_expired_entry_is_reused_in_place() {
        let engine = CounterEngine::new(Duration::from_millis(20));
        engine.increment("k");
        let before = engine.entry(b"k").unwrap();

        thread::sleep(Duration::from_millis(40));
        assert_eq!(engine.increment("k"), (1, false));

        let after = engine.entry(b"k").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(engine.stats().expired_resets, 1);
    }

    #[test]
    fn test_sliding_expiry() {
        let engine = CounterEngine::new(Duration::from_millis(80));
        engine.increment("k");

        // Total elapsed time well past the TTL, but each gap is shorter
        for n in 2..=8 {
            thread::sleep(Duration::from_millis(25));
            assert_eq!(engine.increment("k"), (n, true));
        }
    }

    #[test]
    fn test_zero_ttl_always_fresh() {
        let engine = CounterEngine::new(Duration::ZERO);
        assert_eq!(engine.increment("k"), (1, false));
        assert_eq!(engine.increment("k"), (1, false));
        assert_eq!(engine.get("k"), None);
    }

    #[test]
    fn test_binary_and_empty_keys() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        assert_eq!(engine.increment(b"\x00\xff"), (1, false));
        assert_eq!(engine.increment(Bytes::from_static(b"\x00\xff")), (2, true));
        assert_eq!(engine.increment(""), (1, false));
        assert_eq!(engine.increment(String::new()), (2, true));
    }

    #[test]
    fn test_get_does_not_extend_ttl() {
        let engine = CounterEngine::new(Duration::from_millis(60));
        engine.increment("k");
        engine.increment("k");

        thread::sleep(Duration::from_millis(30));
        assert_eq!(engine.get("k"), Some(2));
        assert!(engine.contains("k"));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.get("k"), None);
        assert!(!engine.contains("k"));
        assert_eq!(engine.increment("k"), (1, false));
    }

    #[test]
    fn test_get_missing() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        assert_eq!(engine.get("nonexistent"), None);
        assert_eq!(engine.remaining_ttl("nonexistent"), None);
    }

    #[test]
    fn test_remaining_ttl() {
        let engine = CounterEngine::new(Duration::from_secs(10));
        engine.increment("k");
        let remaining = engine.remaining_ttl("k").unwrap();
        assert!(remaining > Duration::from_secs(9) && remaining <= Duration::from_secs(10));
    }

    #[test]
    fn test_remove() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        engine.increment("k");
        engine.increment("k");

        assert_eq!(engine.remove("k"), Some(2));
        assert_eq!(engine.remove("k"), None);
        assert_eq!(engine.increment("k"), (1, false));
    }

    #[test]
    fn test_clear() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        engine.increment("a");
        engine.increment("b");
        assert_eq!(engine.len(), 2);

        engine.clear();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_cleanup_expired() {
        let engine = CounterEngine::new(Duration::from_millis(20));
        engine.increment("key1");
        engine.increment("key2");

        thread::sleep(Duration::from_millis(40));
        engine.increment("key3");

        // Expired entries are still held until swept
        assert_eq!(engine.len(), 3);
        assert_eq!(engine.live_len(), 1);

        assert_eq!(engine.cleanup_expired(), 2);
        assert_eq!(engine.len(), 1);
        assert!(engine.contains("key3"));

        let stats = engine.stats();
        assert_eq!(stats.reclaimed, 2);
        assert_eq!(stats.sweeps, 1);
    }

    #[test]
    fn test_cleanup_nothing_expired() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        engine.increment("k");
        assert_eq!(engine.cleanup_expired(), 0);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_stats() {
        let engine = CounterEngine::new(Duration::from_secs(1));
        engine.increment("a");
        engine.increment("a");
        engine.increment("b");

        let stats = engine.stats();
        assert_eq!(
            stats,
            CounterStats {
                keys: 2,
                increments: 3,
                fresh_starts: 2,
                expired_resets: 0,
                reclaimed: 0,
                sweeps: 0,
            }
        );
    }

    #[test]
    fn test_concurrent_increment_same_fresh_key() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 50;

        let engine = Arc::new(CounterEngine::new(Duration::from_secs(10)));
        let barrier = Arc::new(Barrier::new(THREADS));
        let mut handles = vec![];

        for _ in 0..THREADS {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                (0..PER_THREAD)
                    .map(|_| engine.increment("shared"))
                    .collect::<Vec<_>>()
            }));
        }

        let results: Vec<(u64, bool)> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();

        let total = (THREADS * PER_THREAD) as u64;
        let values: HashSet<u64> = results.iter().map(|(value, _)| *value).collect();
        assert_eq!(values.len(), results.len());
        assert_eq!(values, (1..=total).collect::<HashSet<_>>());

        let fresh: Vec<_> = results.iter().filter(|(_, found)| !found).collect();
        assert_eq!(fresh, vec![&(1, false)]);
    }

    #[test]
    fn test_concurrent_access_different_keys() {
        let engine = Arc::new(CounterEngine::new(Duration::from_secs(10)));
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    assert_eq!(engine.increment(&key), (1, false));
                    assert_eq!(engine.increment(&key), (2, true));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
        assert_eq!(engine.stats().increments, 2000);
    }

    #[test]
    fn test_concurrent_increment_with_cleanup() {
        let engine = Arc::new(CounterEngine::new(Duration::from_millis(5)));

        let sweeper = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..50 {
                    engine.cleanup_expired();
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..500 {
                        let (value, found) = engine.increment(format!("k{}", (t * 7 + i) % 13));
                        assert!(value >= 1);
                        assert_eq!(found, value > 1);
                    }
                })
            })
            .collect();

        for handle in workers {
            handle.join().unwrap();
        }
        sweeper.join().unwrap();
    }
}
