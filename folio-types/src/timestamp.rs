//! Millisecond wall-clock helpers.
//!
//! All persisted timestamps are `i64` milliseconds since the Unix epoch.
//! [`MonotonicClock`] hands out strictly increasing values for records whose
//! identity is their creation time (checkpoints), borrowing the tick rule of
//! a hybrid logical clock: use the wall clock when it has moved forward,
//! otherwise bump the last value by one.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall time in milliseconds since the Unix epoch.
///
/// A clock set before 1970 reads as `0`.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// A clock whose readings never repeat and never go backwards.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    /// Creates a clock that has not issued any timestamp yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock whose next reading is strictly greater than `last`.
    #[must_use]
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    /// Raises the floor so later readings are strictly greater than `ts`.
    pub fn observe(&self, ts: i64) {
        self.last.fetch_max(ts, Ordering::SeqCst);
    }

    /// Returns the next timestamp: `max(now, last + 1)`.
    pub fn tick(&self) -> i64 {
        self.tick_at(now_millis())
    }

    /// Same as [`tick`](Self::tick) with an explicit wall time.
    pub fn tick_at(&self, now: i64) -> i64 {
        let mut current = self.last.load(Ordering::SeqCst);
        loop {
            let next = now.max(current.saturating_add(1));
            match self
                .last
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns the last issued (or observed) timestamp.
    #[must_use]
    pub fn last(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }
}
