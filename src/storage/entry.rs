//! Per-Key Counter Entry
//!
//! An [`Entry`] is one counter plus its expiration timestamp. It carries its
//! own lock so that touching or inspecting one key never contends with other
//! keys, even when the caller does not hold the engine's structural lock.
//!
//! ## State
//!
//! ```text
//!   expires_at = None          expires_at = Some(t)
//!  ┌──────────────────┐       ┌──────────────────────┐
//!  │  never touched   │─touch─>│ live while now < t   │
//!  │ (reports expired)│       │ expired once now >= t│
//!  └──────────────────┘       └──────────────────────┘
//! ```
//!
//! Every mutation that should extend liveness (`restart`, `bump`) sets the
//! value and refreshes the expiry under a single write lock, so a racing
//! observer sees either the old pair or the new pair, never a mix.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Roughly a century.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The value and expiry of one counter, always read and written together.
#[derive(Debug, Clone, Copy, Default)]
struct EntryState {
    value: u64,
    expires_at: Option<Instant>,
}

impl EntryState {
    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(exp) => now >= exp,
            None => true,
        }
    }

    #[inline]
    fn touch_at(&mut self, now: Instant, ttl: Duration) {
        // A TTL too large for Instant is clamped to "effectively never"
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.expires_at = Some(expires_at);
    }
}

/// A single counter with a sliding expiry.
///
/// Entries are created and destroyed by the [`CounterEngine`](super::CounterEngine);
/// they never remove themselves.
#[derive(Debug, Default)]
pub struct Entry {
    state: RwLock<EntryState>,
}

impl Entry {
    /// Creates an entry that has never been touched.
    ///
    /// Its value is 0 and it reports itself as expired until [`touch`](Self::touch)
    /// is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a live entry with value 1, expiring `ttl` from now.
    pub fn fresh(ttl: Duration) -> Self {
        let mut state = EntryState {
            value: 1,
            expires_at: None,
        };
        state.touch_at(Instant::now(), ttl);
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, EntryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the expiry to `now + ttl`.
    pub fn touch(&self, ttl: Duration) {
        self.write().touch_at(Instant::now(), ttl);
    }

    /// Returns `true` if the expiry is unset or has been reached.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock
    /// reading. A sweep pass uses one reading for the whole map.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.read().is_expired_at(now)
    }

    /// Starts the count over at 1 and refreshes the expiry.
    pub fn restart(&self, ttl: Duration) -> u64 {
        let mut state = self.write();
        state.value = 1;
        state.touch_at(Instant::now(), ttl);
        state.value
    }

    /// Refreshes the expiry and adds one to the count, returning the new value.
    ///
    /// The count saturates at `u64::MAX`.
    pub fn bump(&self, ttl: Duration) -> u64 {
        let mut state = self.write();
        state.touch_at(Instant::now(), ttl);
        state.value = state.value.saturating_add(1);
        state.value
    }

    /// Returns the current count regardless of expiry.
    pub fn value(&self) -> u64 {
        self.read().value
    }

    /// Returns the count if the entry is still live.
    pub fn live_value(&self) -> Option<u64> {
        let state = self.read();
        (!state.is_expired_at(Instant::now())).then_some(state.value)
    }

    /// Returns the time left before expiry, or `None` if already expired.
    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        let state = self.read();
        match state.expires_at {
            Some(exp) if now < exp => Some(exp - now),
            _ => None,
        }
    }
}
