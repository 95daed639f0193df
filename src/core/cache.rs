// src/core/cache.rs

//! A time-windowed membership set.
//!
//! The store deletes a queue's list key the moment its backlog drains, so a
//! queue that merely went idle would vanish from a raw key listing.
//! Remembering every name for a window after it was last seen lets the
//! exporter keep reporting the queue (at length zero) until the window
//! elapses without a sighting.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for [`ExpiringSet`]. Injected so expiry is testable without
/// waiting on the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The default clock, backed by `Instant::now`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A set whose members expire once they have gone unseen for a fixed window.
///
/// Membership reads evict lazily; there is no background sweeper and no
/// read-only view.
pub struct ExpiringSet<T> {
    window: Duration,
    entries: HashMap<T, Instant>,
    clock: Arc<dyn Clock>,
}

impl<T: Eq + Hash + Clone> ExpiringSet<T> {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            entries: HashMap::new(),
            clock,
        }
    }

    /// Records `value` as seen now. Re-insertion replaces the stored value
    /// wholesale, so fields outside the `Eq`/`Hash` identity refresh too.
    pub fn insert(&mut self, value: T) {
        let now = self.clock.now();
        self.entries.remove(&value);
        self.entries.insert(value, now);
    }

    /// Evicts everything last seen strictly before `now - window`, then
    /// returns the surviving members.
    pub fn snapshot(&mut self) -> HashSet<T> {
        self.evict_expired();
        self.entries.keys().cloned().collect()
    }

    /// Number of live members, after eviction.
    pub fn len(&mut self) -> usize {
        self.evict_expired();
        self.entries.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&mut self) {
        let now = self.clock.now();
        // An Instant taken near process start can be younger than the window;
        // in that case nothing can have expired yet.
        let Some(deadline) = now.checked_sub(self.window) else {
            return;
        };
        self.entries.retain(|_, last_seen| *last_seen >= deadline);
    }
}
