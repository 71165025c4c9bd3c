//! Time sources for store and access timestamps.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the "now" of mode operations, in nanoseconds.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// Current time in nanoseconds.
    fn now(&self) -> i64;
}

/// Wall clock, forced to increase strictly between calls.
///
/// Two calls within the clock's resolution, or across a backwards clock
/// step, still yield distinct ascending values.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    /// Creates a new clock.
    pub fn new() -> Self {
        Self::default()
    }
}

fn wall_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX))
}

impl TimeSource for SystemClock {
    fn now(&self) -> i64 {
        let wall = wall_nanos();
        let next = |last: i64| wall.max(last.saturating_add(1));
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(next(last)))
        {
            Ok(last) | Err(last) => next(last),
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    /// Creates a clock reading `now`.
    pub const fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Sets the time.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::Release);
    }

    /// Moves the time by `delta`, returning the new time.
    pub fn advance(&self, delta: i64) -> i64 {
        self.now.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta)
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}
