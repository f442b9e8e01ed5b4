//! Time source abstraction.
//!
//! Coordinator logic never reads the clock on its own: monotonic instants are
//! passed into every event handler, and wall-clock timestamps (watch history)
//! come from an injected [`Clock`]. Tests drive a [`ManualClock`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Provides monotonic and wall-clock time.
pub trait Clock: Send + Sync + Debug + 'static {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Current UTC datetime
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Clone, Debug)]
pub struct ManualClock {
    instant: Arc<Mutex<Instant>>,
    utc: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// Create a clock whose wall time starts at `start`
    pub fn new_at(start: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(Mutex::new(Instant::now())),
            utc: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance both monotonic and wall time
    pub fn advance(&self, duration: Duration) {
        *self.instant.lock() += duration;
        let delta = chrono::Duration::from_std(duration)
            .unwrap_or(chrono::Duration::MAX);
        let mut utc = self.utc.lock();
        *utc = utc.checked_add_signed(delta).unwrap_or(*utc);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.instant.lock()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        *self.utc.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_both_timelines() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        let u0 = clock.utc_now();

        clock.advance(Duration::from_millis(1_500));

        assert_eq!(clock.now() - t0, Duration::from_millis(1_500));
        assert_eq!((clock.utc_now() - u0).num_milliseconds(), 1_500);
    }
}
